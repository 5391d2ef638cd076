//! The single-page UI served on `/`.

pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>attnscope | Interactive Attention Visualization</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; background-color: #f5f5f5; }
        .container { max-width: 800px; margin: 0 auto; background: white; padding: 30px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        h1 { color: #333; text-align: center; margin-bottom: 30px; }
        .input-section { margin-bottom: 30px; }
        .input-section label { font-weight: bold; display: block; margin-bottom: 10px; }
        .input-section textarea { width: 100%; height: 80px; padding: 10px; border: 2px solid #ddd; border-radius: 5px; font-size: 16px; resize: vertical; }
        .input-section select { margin-top: 10px; padding: 8px; }
        .input-section button { background: #007bff; color: white; padding: 12px 24px; border: none; border-radius: 5px; font-size: 16px; cursor: pointer; margin-top: 10px; }
        .input-section button:hover { background: #0056b3; }
        .input-section button:disabled { background: #ccc; cursor: not-allowed; }
        .token { padding: 3px 6px; margin: 2px; border-radius: 4px; display: inline-block; }
        .info { margin: 20px 0; color: #666; }
        .loading { color: #007bff; font-style: italic; }
        .error { color: #dc3545; background: #f8d7da; padding: 10px; border-radius: 5px; }
        .info-row { display: flex; gap: 15px; margin: 15px 0; }
        .info-box { flex: 1; background: #f5f5f5; border: 1px solid #ddd; border-radius: 6px; padding: 12px; font-size: 13px; }
        .info-box h3 { margin: 0 0 8px 0; color: #666; font-size: 14px; }
        .tech-details { color: #555; font-family: monospace; }
        .prediction-token { position: relative; cursor: pointer; background-color: #87CEEB; border: 2px solid #4682B4; margin-left: 5px; }
        .tooltip { visibility: hidden; width: 300px; background-color: #333; color: #fff; text-align: left; border-radius: 6px; padding: 12px; position: absolute; z-index: 1; bottom: 125%; left: 50%; margin-left: -150px; opacity: 0; transition: opacity 0.3s; font-size: 12px; }
        .prediction-token:hover .tooltip { visibility: visible; opacity: 1; }
        .candidate-item { margin: 3px 0; padding: 2px 0; border-bottom: 1px solid #555; }
        .candidate-item:last-child { border-bottom: none; }
        .candidate-rank { color: #87CEEB; font-weight: bold; width: 24px; display: inline-block; }
        .candidate-token { color: #fff; font-weight: bold; margin: 0 8px; }
        .candidate-prob { color: #ccc; font-size: 11px; }
        .token-row { font-family: monospace; margin: 3px 0; padding: 5px; background: #f8f9fa; border-radius: 4px; border-left: 4px solid #007bff; }
        .token-index, .token-id, .token-weight { color: #666; }
        .token-text { font-weight: bold; color: #333; }
        .token-bar { color: #007bff; margin-left: 10px; }
        .weight-sum { margin-top: 15px; padding: 10px; background: #e9ecef; border-radius: 4px; font-family: monospace; }
        .sum-ok { color: #28a745; font-size: 18px; margin-left: 8px; }
        .sum-off { color: #dc3545; font-size: 18px; margin-left: 8px; }
        .sum-na { color: #666; margin-left: 8px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Prompt Attention Visualization</h1>

        <div class="input-section">
            <label for="textInput">Enter your text:</label>
            <textarea id="textInput" placeholder="e.g. Hello world, I am a student.">Hello world, I am a student.</textarea>
            <select id="modeSelect">
                <option value="last_token_distribution">Last token distribution</option>
                <option value="column_sum_normalized">Column sum (min-max scaled)</option>
            </select>
            <button onclick="visualizeAttention()" id="visualizeBtn">Analyze attention</button>
        </div>

        <div id="resultSection" style="display: none;">
            <h3>Attention weights</h3>
            <div class="info" id="inputInfo"></div>
            <div id="visualization"></div>

            <div class="info">
                <strong>How to read this:</strong><br>
                &bull; <span style="color: #d32f2f;">Red tokens</span> show how much the last position attends to each input token<br>
                &bull; The <span style="color: #1976d2;">blue chip</span> is the predicted next token<br>
                &bull; Darker red means a larger contribution to that prediction<br>
                &bull; Hover a red token to see its weight, hover the blue chip for the top candidates
            </div>

            <div class="info-row" id="infoRow" style="display: none;">
                <div class="info-box">
                    <h3>Tokenizer</h3>
                    <div class="tech-details" id="techDetails"></div>
                </div>
                <div class="info-box">
                    <h3>Keep in mind</h3>
                    <div style="font-size: 12px; line-height: 1.4;">
                        &bull; Different tokenizers split the same text differently<br>
                        &bull; Weights are per token, not per word<br>
                        &bull; Switching models changes the weight distribution
                    </div>
                </div>
            </div>

            <div class="info-box" id="tokenDetails" style="display: none; margin: 15px 0;">
                <h3>Token details</h3>
                <div style="background: white; padding: 8px; border-radius: 4px; border: 1px solid #ddd;" id="tokenDetailsContent"></div>
                <div style="margin-top: 8px; font-size: 11px; color: #666;">
                    [index] "token" (ID: token_id) | bar length is relative to the largest weight | weights should sum to about 1.0
                </div>
            </div>
        </div>
    </div>

    <script>
        function escapeHtml(text) {
            return text.replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;').replace(/"/g, '&quot;');
        }

        async function visualizeAttention() {
            const text = document.getElementById('textInput').value.trim();
            const mode = document.getElementById('modeSelect').value;
            const button = document.getElementById('visualizeBtn');
            const resultSection = document.getElementById('resultSection');
            const inputInfo = document.getElementById('inputInfo');
            const visualization = document.getElementById('visualization');

            if (!text) {
                alert('Please enter some text');
                return;
            }

            button.disabled = true;
            button.innerHTML = 'Analyzing...';
            resultSection.style.display = 'block';
            document.getElementById('infoRow').style.display = 'none';
            document.getElementById('tokenDetails').style.display = 'none';
            inputInfo.innerHTML = 'Input: "' + escapeHtml(text) + '"';
            visualization.innerHTML = '<div class="loading">Running the model, please wait...</div>';

            try {
                const response = await fetch('/visualize', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ text: text, mode: mode })
                });
                const data = await response.json();

                if (data.success) {
                    let html = data.html;
                    if (data.prediction) {
                        const prob = (data.prediction.probability * 100).toFixed(1);
                        let tooltip = '<div><strong>Top-' + data.prediction.top_candidates.length + ' candidates:</strong></div>';
                        data.prediction.top_candidates.forEach(function (c) {
                            tooltip += '<div class="candidate-item">'
                                + '<span class="candidate-rank">' + c.rank + '.</span>'
                                + '<span class="candidate-token">"' + escapeHtml(c.token) + '"</span>'
                                + '<span class="candidate-prob">' + (c.probability * 100).toFixed(1) + '%</span>'
                                + '</div>';
                        });
                        html += '<span class="token prediction-token">' + escapeHtml(data.prediction.token)
                            + '(' + prob + '%)<div class="tooltip">' + tooltip + '</div></span>';
                    }
                    visualization.innerHTML = html;

                    const info = data.tokenizer_info;
                    const vocab = typeof info.vocab_size === 'number' ? info.vocab_size.toLocaleString() : info.vocab_size;
                    document.getElementById('techDetails').innerHTML =
                        '<strong>Model:</strong> ' + escapeHtml(info.model_name) + '<br>'
                        + '<strong>Tokenizer:</strong> ' + escapeHtml(info.tokenizer_type) + '<br>'
                        + '<strong>Vocabulary size:</strong> ' + vocab + '<br>'
                        + '<strong>Special tokens:</strong> ' + info.special_tokens_count;
                    document.getElementById('infoRow').style.display = 'flex';

                    inputInfo.innerHTML = '<strong>Input:</strong> "' + escapeHtml(text) + '"<br>'
                        + '<strong>Tokens:</strong> ' + data.token_count
                        + ' &middot; <strong>Mode:</strong> ' + data.mode;

                    document.getElementById('tokenDetailsContent').innerHTML = data.token_details_html;
                    document.getElementById('tokenDetails').style.display = 'block';
                } else {
                    visualization.innerHTML = '<div class="error">Error: ' + escapeHtml(data.error) + '</div>';
                }
            } catch (error) {
                visualization.innerHTML = '<div class="error">Request failed: ' + escapeHtml(error.message) + '</div>';
            }

            button.disabled = false;
            button.innerHTML = 'Analyze attention';
        }

        document.getElementById('textInput').addEventListener('keydown', function (e) {
            if (e.ctrlKey && e.key === 'Enter') {
                visualizeAttention();
            }
        });
    </script>
</body>
</html>
"##;
