use axum::response::{Html, IntoResponse};

/// 首页处理器
pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Photo Classifier</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 560px; margin: 40px auto; padding: 0 16px; }
        #preview { max-width: 200px; max-height: 200px; display: none; margin: 16px 0; }
        #result { white-space: pre-wrap; background: #f4f4f4; padding: 12px; border-radius: 6px; }
    </style>
</head>
<body>
    <h1>Photo Classifier</h1>
    <form id="form">
        <input type="file" id="file" name="file" accept="image/*" capture="environment">
        <label>Top K <input type="number" id="topK" value="3" min="1" max="10"></label>
        <button type="submit">Classify</button>
    </form>
    <img id="preview" alt="Selected image">
    <div id="result">No prediction yet</div>
    <script>
        const fileInput = document.getElementById('file');
        const preview = document.getElementById('preview');
        const result = document.getElementById('result');

        fileInput.addEventListener('change', () => {
            const file = fileInput.files[0];
            if (!file) return;
            preview.src = URL.createObjectURL(file);
            preview.style.display = 'block';
        });

        document.getElementById('form').addEventListener('submit', async (event) => {
            event.preventDefault();
            const file = fileInput.files[0];
            if (!file) { result.textContent = 'Please choose an image'; return; }

            const body = new FormData();
            body.append('file', file);
            body.append('top_k', document.getElementById('topK').value);
            body.append('output_format', 'text');

            result.textContent = 'Classifying...';
            const response = await fetch('/predict/upload', { method: 'POST', body });
            if (response.ok) {
                result.textContent = await response.text();
            } else {
                const error = await response.json();
                result.textContent = 'Error: ' + error.error.message;
            }
        });
    </script>
</body>
</html>
"#;
