//! Landing page markup

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::chat::LandingContext;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Chat</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
#log { border: 1px solid #ccc; border-radius: 6px; padding: 1rem; min-height: 20rem; overflow-y: auto; }
.turn { margin: 0.5rem 0; white-space: pre-wrap; }
.user { color: #1a4d8f; }
.error { color: #a61b1b; }
details { color: #555; }
form { display: flex; gap: 0.5rem; margin-top: 1rem; }
#message { flex: 1; }
</style>
</head>
<body>
"#;

const PAGE_SCRIPT: &str = r#"<script>
const log = document.getElementById('log');
const modelName = document.getElementById('model-name');

function append(cls, text, reasoning) {
  const div = document.createElement('div');
  div.className = 'turn ' + cls;
  if (reasoning) {
    const details = document.createElement('details');
    const summary = document.createElement('summary');
    summary.textContent = 'Reasoning';
    details.append(summary, reasoning);
    div.append(details);
  }
  div.append(text);
  log.append(div);
  log.scrollTop = log.scrollHeight;
}

document.getElementById('model').addEventListener('change', async (e) => {
  const res = await fetch('/set_model', { method: 'POST', body: new URLSearchParams({ model: e.target.value }) });
  const data = await res.json();
  if (data.status === 'success') {
    modelName.textContent = data.model_name;
    log.replaceChildren();
  } else {
    append('error', data.message);
  }
});

document.getElementById('chat').addEventListener('submit', async (e) => {
  e.preventDefault();
  const input = document.getElementById('message');
  const message = input.value.trim();
  if (!message) return;
  input.value = '';
  append('user', message);
  try {
    const res = await fetch('/chat', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ message }),
    });
    const data = await res.json();
    if (data.error) append('error', data.error);
    else append('assistant', data.final_answer, data.reasoning);
  } catch (err) {
    append('error', String(err));
  }
});
</script>
</body>
</html>
"#;

/// Render the chat page for the given model table and selection
pub fn render_landing(ctx: &LandingContext) -> String {
    let mut options = String::new();
    for model in &ctx.models {
        let selected = if model.key == ctx.current_model { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>\n",
            encode_double_quoted_attribute(&model.key),
            selected,
            encode_text(&model.name)
        ));
    }

    let body = format!(
        r#"<h1>Chat</h1>
<p>Model: <strong id="model-name">{current}</strong></p>
<select id="model" name="model">
{options}</select>
<div id="log"></div>
<form id="chat">
<input id="message" name="message" autocomplete="off" placeholder="Type a message">
<button type="submit">Send</button>
</form>
"#,
        current = encode_text(&ctx.current_model_name),
        options = options,
    );

    let mut page = String::with_capacity(PAGE_HEAD.len() + body.len() + PAGE_SCRIPT.len());
    page.push_str(PAGE_HEAD);
    page.push_str(&body);
    page.push_str(PAGE_SCRIPT);
    page
}
