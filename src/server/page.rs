/// Upload page. `{{MAX_UPLOAD_LABEL}}` and `{{MAX_UPLOAD_BYTES}}` are filled in per request.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Image Insight</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #1e3c72 0%, #2a5298 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            padding: 20px;
        }

        .container {
            background: white;
            border-radius: 16px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 760px;
            width: 100%;
            padding: 36px;
        }

        h1 { color: #222; margin-bottom: 8px; }
        .subtitle { color: #666; margin-bottom: 28px; font-size: 0.9em; }

        .drop-zone {
            border: 3px dashed #2a5298;
            border-radius: 12px;
            padding: 56px 20px;
            text-align: center;
            cursor: pointer;
            background: #f5f8ff;
            transition: all 0.2s;
        }
        .drop-zone.dragover { background: #e6eeff; transform: scale(1.01); }
        .drop-text { color: #2a5298; font-size: 1.15em; font-weight: 600; }
        .drop-hint { color: #999; font-size: 0.85em; margin-top: 8px; }
        input[type="file"] { display: none; }

        .loading, .result, .error { display: none; margin-top: 24px; }
        .loading { text-align: center; color: #555; }
        .spinner {
            border: 4px solid #eee;
            border-top: 4px solid #2a5298;
            border-radius: 50%;
            width: 44px;
            height: 44px;
            animation: spin 1s linear infinite;
            margin: 0 auto 16px;
        }
        @keyframes spin { to { transform: rotate(360deg); } }

        .preview { max-width: 100%; border-radius: 10px; margin-bottom: 16px; }
        .label {
            color: #2a5298;
            font-weight: 600;
            font-size: 0.8em;
            text-transform: uppercase;
            letter-spacing: 1px;
            margin: 14px 0 6px;
        }
        .description { color: #333; line-height: 1.6; }
        .tag {
            display: inline-block;
            background: #2a5298;
            color: white;
            padding: 4px 12px;
            border-radius: 16px;
            font-size: 0.8em;
            margin: 0 6px 6px 0;
        }
        .meter { background: #eee; border-radius: 6px; height: 10px; overflow: hidden; }
        .meter-fill { background: #2a5298; height: 100%; width: 0; }

        .error {
            background: #fee;
            border: 2px solid #fcc;
            color: #c33;
            padding: 14px;
            border-radius: 10px;
        }
        button {
            margin-top: 12px;
            background: #2a5298;
            color: white;
            border: none;
            border-radius: 8px;
            padding: 8px 18px;
            cursor: pointer;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Image Insight</h1>
        <p class="subtitle">Upload an image to get a description, tags and a confidence score.</p>

        <div class="drop-zone" id="dropZone">
            <div class="drop-text">Click or drag an image here</div>
            <div class="drop-hint">JPG, PNG, WebP (Max {{MAX_UPLOAD_LABEL}})</div>
            <input type="file" id="fileInput" accept="image/*">
        </div>

        <div class="loading" id="loading">
            <div class="spinner"></div>
            <p>Analyzing image...</p>
        </div>

        <div class="error" id="error">
            <span id="errorText"></span>
            <div><button id="retry" type="button">Try again</button></div>
        </div>

        <div class="result" id="result">
            <img id="preview" class="preview" alt="Uploaded image">
            <div class="label">Description</div>
            <div class="description" id="description"></div>
            <div class="label">Tags</div>
            <div id="tags"></div>
            <div class="label">Confidence <span id="confidenceText"></span></div>
            <div class="meter"><div class="meter-fill" id="confidence"></div></div>
            <button id="again" type="button">Analyze another image</button>
        </div>
    </div>

    <script>
        const $ = (id) => document.getElementById(id);
        const dropZone = $('dropZone');
        const fileInput = $('fileInput');
        const MAX_UPLOAD_BYTES = {{MAX_UPLOAD_BYTES}};
        let lastFile = null;

        function show(section) {
            dropZone.style.display = section === 'upload' || section === 'error' ? 'block' : 'none';
            $('loading').style.display = section === 'loading' ? 'block' : 'none';
            $('result').style.display = section === 'result' ? 'block' : 'none';
            $('error').style.display = section === 'error' ? 'block' : 'none';
        }

        dropZone.addEventListener('click', () => fileInput.click());
        dropZone.addEventListener('dragover', (e) => {
            e.preventDefault();
            dropZone.classList.add('dragover');
        });
        dropZone.addEventListener('dragleave', () => dropZone.classList.remove('dragover'));
        dropZone.addEventListener('drop', (e) => {
            e.preventDefault();
            dropZone.classList.remove('dragover');
            const file = e.dataTransfer.files[0];
            if (file && file.type.startsWith('image/')) analyze(file);
        });
        fileInput.addEventListener('change', (e) => {
            if (e.target.files[0]) analyze(e.target.files[0]);
        });
        $('retry').addEventListener('click', () => lastFile && analyze(lastFile));
        $('again').addEventListener('click', () => { fileInput.value = ''; show('upload'); });

        async function analyze(file) {
            lastFile = file;
            if (file.size > MAX_UPLOAD_BYTES) {
                $('errorText').textContent = 'File exceeds the upload size limit ({{MAX_UPLOAD_LABEL}})';
                show('error');
                return;
            }
            show('loading');

            const form = new FormData();
            form.append('file', file);

            try {
                const response = await fetch('/api/process-image', { method: 'POST', body: form });
                const body = await response.json();
                if (!response.ok || !body.success) {
                    throw new Error(body.error || 'Failed to process image');
                }

                const data = body.data;
                $('preview').src = data.imageUrl;
                $('description').textContent = data.description;
                const tags = $('tags');
                tags.replaceChildren(...data.tags.map((t) => {
                    const span = document.createElement('span');
                    span.className = 'tag';
                    span.textContent = t;
                    return span;
                }));
                const pct = Math.round(data.confidence * 100);
                $('confidence').style.width = pct + '%';
                $('confidenceText').textContent = '(' + pct + '%)';
                show('result');
            } catch (err) {
                $('errorText').textContent = err.message;
                show('error');
            }
        }
    </script>
</body>
</html>
"#;
