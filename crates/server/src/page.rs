/// Control page served at `/`.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>facewatch</title>
<style>
  body { margin: 0; font-family: sans-serif; background: #111; color: #eee; }
  main { display: flex; gap: 24px; padding: 24px; }
  #feed { background: #000; width: 640px; height: 480px; object-fit: contain; }
  button { padding: 8px 16px; margin-right: 8px; }
  #status { margin: 12px 0; min-height: 1.2em; }
  li.known { color: #4caf50; }
  li.criminal { color: #f44336; font-weight: bold; }
  li.unknown { color: #ffbf00; }
</style>
</head>
<body>
<main>
  <section>
    <img id="feed" alt="live video">
  </section>
  <section>
    <button id="start">Start</button>
    <button id="stop">Stop</button>
    <button id="ping">Test</button>
    <p id="status"></p>
    <h3>Faces</h3>
    <ul id="faces"></ul>
  </section>
</main>
<script>
  const feed = document.getElementById("feed");
  const status = document.getElementById("status");
  const faces = document.getElementById("faces");

  async function call(path) {
    const res = await fetch(path);
    const body = await res.json();
    status.textContent = body.message;
    return body;
  }

  document.getElementById("start").onclick = async () => {
    const body = await call("/start_recognition");
    if (body.status === "started" || body.status === "already_running") {
      feed.src = "/video_feed?t=" + Date.now();
    }
  };

  document.getElementById("stop").onclick = async () => {
    await call("/stop_recognition");
    feed.removeAttribute("src");
  };

  document.getElementById("ping").onclick = () => call("/test");

  async function poll() {
    try {
      const res = await fetch("/get_face_data");
      const body = await res.json();
      faces.replaceChildren(...body.faces.map(face => {
        const li = document.createElement("li");
        li.className = face.type;
        li.textContent = face.name;
        return li;
      }));
    } catch (e) {
      status.textContent = "Server unreachable";
    }
  }
  setInterval(poll, 1000);
</script>
</body>
</html>
"#;
