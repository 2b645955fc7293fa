/// The single-page chat UI served at `/`.
///
/// Talks to the JSON API only; the cookie is handled by the browser.
pub const CHAT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Parley</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
  body { font-family: system-ui, sans-serif; margin: 0; display: flex; height: 100vh; }
  #sidebar { width: 260px; border-right: 1px solid #ddd; padding: 1rem; box-sizing: border-box; }
  #main { flex: 1; display: flex; flex-direction: column; padding: 1rem; box-sizing: border-box; }
  #history { flex: 1; overflow-y: auto; }
  .turn { margin: 0.5rem 0; padding: 0.5rem 0.75rem; border-radius: 6px; white-space: pre-wrap; }
  .user { background: #e8f0fe; }
  .assistant { background: #f1f3f4; }
  #login { margin: auto; display: flex; flex-direction: column; gap: 0.5rem; width: 240px; }
  .error { color: #b00020; }
  .hidden { display: none !important; }
  select { width: 100%; }
</style>
</head>
<body>
<form id="login" class="hidden">
  <h2>Log in</h2>
  <input id="username" placeholder="Username" autocomplete="username">
  <input id="password" type="password" placeholder="Password" autocomplete="current-password">
  <button type="submit">Log in</button>
  <div id="login-error" class="error"></div>
</form>

<div id="sidebar" class="hidden">
  <div>Logged in as <b id="who"></b></div>
  <p><button id="new-chat">New Chat</button> <button id="logout">Log out</button></p>
  <label for="sessions">Previous chats</label>
  <select id="sessions" size="12"></select>
</div>

<div id="main" class="hidden">
  <div id="history"></div>
  <form id="prompt-form">
    <textarea id="prompt" rows="3" style="width:100%" placeholder="Type a message"></textarea>
    <button type="submit" id="send">Send</button>
    <span id="chat-error" class="error"></span>
  </form>
</div>

<script>
const $ = (id) => document.getElementById(id);

async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body !== undefined) {
    opts.headers["content-type"] = "application/json";
    opts.body = JSON.stringify(body);
  }
  const resp = await fetch(path, opts);
  const data = await resp.json().catch(() => ({}));
  return { ok: resp.ok, status: resp.status, data };
}

function showLogin() {
  $("login").classList.remove("hidden");
  $("sidebar").classList.add("hidden");
  $("main").classList.add("hidden");
}

function showChat(username) {
  $("who").textContent = username;
  $("login").classList.add("hidden");
  $("sidebar").classList.remove("hidden");
  $("main").classList.remove("hidden");
}

function render(transcript) {
  const history = $("history");
  history.innerHTML = "";
  for (const turn of transcript.turns) {
    const div = document.createElement("div");
    div.className = "turn " + turn.role;
    div.textContent = turn.content;
    history.appendChild(div);
  }
  history.scrollTop = history.scrollHeight;
}

async function refreshSessions() {
  const { ok, data } = await api("GET", "/api/sessions");
  if (!ok) return;
  const select = $("sessions");
  select.innerHTML = "";
  for (const entry of data) {
    const opt = document.createElement("option");
    opt.value = entry.session_id;
    opt.textContent = entry.label;
    select.appendChild(opt);
  }
}

async function boot() {
  const me = await api("GET", "/api/me");
  if (!me.ok) return showLogin();
  showChat(me.data.username);
  const t = await api("GET", "/api/transcript");
  if (t.ok) render(t.data);
  await refreshSessions();
}

$("login").addEventListener("submit", async (e) => {
  e.preventDefault();
  $("login-error").textContent = "";
  const { ok, data } = await api("POST", "/api/login", {
    username: $("username").value,
    password: $("password").value,
  });
  if (!ok) {
    $("login-error").textContent = data.error || "Login failed";
    return;
  }
  $("password").value = "";
  await boot();
});

$("prompt-form").addEventListener("submit", async (e) => {
  e.preventDefault();
  const prompt = $("prompt").value;
  if (!prompt.trim()) return;
  $("send").disabled = true;
  $("chat-error").textContent = "";
  const { ok, status, data } = await api("POST", "/api/chat", { prompt });
  $("send").disabled = false;
  if (status === 401) return showLogin();
  if (data.transcript) render(data.transcript);
  if (!ok) {
    $("chat-error").textContent = data.error || "Request failed";
    return;
  }
  $("prompt").value = "";
  await refreshSessions();
});

$("new-chat").addEventListener("click", async () => {
  const { ok, data } = await api("POST", "/api/sessions");
  if (ok) render(data);
});

$("sessions").addEventListener("change", async (e) => {
  const id = e.target.value;
  const { ok, data } = await api("POST", "/api/sessions/" + encodeURIComponent(id) + "/select");
  if (ok) render(data);
});

$("logout").addEventListener("click", async () => {
  await api("POST", "/api/logout");
  $("history").innerHTML = "";
  showLogin();
});

boot();
</script>
</body>
</html>
"#;
