//! The single HTML page served at `/`.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Multi-PDF's Chat Agent</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            margin: 0;
            display: flex;
            min-height: 100vh;
            color: #262730;
        }
        aside {
            width: 300px;
            background: #f0f2f6;
            padding: 2rem 1.5rem;
            box-sizing: border-box;
        }
        main {
            flex: 1;
            padding: 2rem 3rem;
            max-width: 760px;
        }
        h1 { margin-top: 0; }
        label { display: block; margin-bottom: 0.5rem; font-size: 14px; }
        input[type=text] {
            width: 100%;
            padding: 10px;
            font-size: 16px;
            border: 1px solid #ccc;
            border-radius: 6px;
            box-sizing: border-box;
        }
        button {
            margin-top: 1rem;
            padding: 8px 16px;
            border: 1px solid #ccc;
            border-radius: 6px;
            background: white;
            cursor: pointer;
        }
        button:disabled { cursor: wait; opacity: 0.6; }
        #status { margin-top: 1rem; color: #09ab3b; }
        #error {
            margin-top: 1rem;
            color: #ff2b2b;
            white-space: pre-wrap;
        }
        #reply { margin-top: 1.5rem; white-space: pre-wrap; line-height: 1.5; }
    </style>
</head>
<body>
    <aside>
        <h3>Menu:</h3>
        <label for="files">Upload your PDF Files and Click on the Submit &amp; Process Button</label>
        <input id="files" type="file" accept="application/pdf,.pdf" multiple>
        <button id="process">Submit &amp; Process</button>
        <div id="status"></div>
    </aside>
    <main>
        <h1>Multi-PDF's Chat Agent</h1>
        <form id="ask-form">
            <label for="question">Ask a Question from the PDF Files uploaded</label>
            <input id="question" type="text" autocomplete="off">
        </form>
        <div id="error"></div>
        <div id="reply"></div>
    </main>
    <script>
        const statusEl = document.getElementById("status");
        const errorEl = document.getElementById("error");
        const replyEl = document.getElementById("reply");
        const processBtn = document.getElementById("process");

        async function errorMessage(response) {
            const text = await response.text();
            try {
                return JSON.parse(text).error.message;
            } catch (_) {
                return text || response.statusText;
            }
        }

        processBtn.addEventListener("click", async () => {
            const files = document.getElementById("files").files;
            errorEl.textContent = "";
            if (files.length === 0) {
                errorEl.textContent = "Select at least one PDF file first.";
                return;
            }
            const form = new FormData();
            for (const file of files) {
                form.append("files", file, file.name);
            }
            processBtn.disabled = true;
            statusEl.textContent = "Processing...";
            try {
                const response = await fetch("/api/process", { method: "POST", body: form });
                if (!response.ok) {
                    throw new Error(await errorMessage(response));
                }
                statusEl.textContent = "Done";
            } catch (e) {
                statusEl.textContent = "";
                errorEl.textContent = e.message;
            } finally {
                processBtn.disabled = false;
            }
        });

        document.getElementById("ask-form").addEventListener("submit", async (event) => {
            event.preventDefault();
            const question = document.getElementById("question").value;
            errorEl.textContent = "";
            replyEl.textContent = "";
            if (question.trim() === "") {
                return;
            }
            try {
                const response = await fetch("/api/ask", {
                    method: "POST",
                    headers: { "content-type": "application/json" },
                    body: JSON.stringify({ question }),
                });
                if (!response.ok) {
                    throw new Error(await errorMessage(response));
                }
                const body = await response.json();
                replyEl.textContent = "Reply: " + body.answer;
            } catch (e) {
                errorEl.textContent = e.message;
            }
        });
    </script>
</body>
</html>
"#;
