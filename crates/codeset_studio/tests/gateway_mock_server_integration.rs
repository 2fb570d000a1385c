use codeset_studio::*;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_models() -> ModelConfig {
    ModelConfig {
        planner: "planner".into(),
        builder: "builder".into(),
        image: "imager".into(),
        tts: "speaker".into(),
        ..ModelConfig::default()
    }
}

fn gateway(server: &MockServer) -> GeminiGateway {
    GeminiGateway::new("test-key", server.uri(), test_models()).unwrap()
}

fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

fn inline_response(mime_type: &str, data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [
                {"text": "Here is your asset."},
                {"inlineData": {"mimeType": mime_type, "data": data}}
            ]}
        }]
    })
}

fn proposal_json() -> String {
    json!({
        "businessName": "Torra Coffee Roasters",
        "targetAudience": "Locals and tourists who care about origin",
        "suggestedStyle": "Warm minimalism",
        "pages": [{"title": "Home", "description": "Roasts and story", "sections": ["Hero", "Roasts"]}],
        "colorPalette": ["#3b2314", "#f4ede4"],
        "copyConcepts": ["Roasted by the Tagus"],
        "marketInsights": "Single-origin subscriptions are growing"
    })
    .to_string()
}

#[tokio::test]
async fn propose_website_sends_schema_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/planner:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": {"responseMimeType": "application/json"},
            "tools": [{"googleSearch": {}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&proposal_json())))
        .expect(1)
        .mount(&server)
        .await;

    let proposal = gateway(&server)
        .propose_website("boutique coffee roaster in Lisbon")
        .await
        .unwrap();

    assert_eq!(proposal.business_name, "Torra Coffee Roasters");
    assert_eq!(proposal.pages.len(), 1);
}

#[tokio::test]
async fn propose_website_without_grounding_omits_tools() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/planner:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&proposal_json())))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server)
        .with_search_grounding(false)
        .propose_website("bakery")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("tools").is_none());
}

#[tokio::test]
async fn malformed_proposals_are_rejected() {
    let missing_pages = {
        let mut value: Value = serde_json::from_str(&proposal_json()).unwrap();
        value.as_object_mut().unwrap().remove("pages");
        value.to_string()
    };

    for text in ["", "{\"businessName\": \"Torra\"", missing_pages.as_str()] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(text)))
            .mount(&server)
            .await;

        let err = gateway(&server).propose_website("bakery").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse, "input {:?}", text);
    }
}

#[tokio::test]
async fn service_error_is_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway(&server).propose_website("bakery").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn generate_files_splits_preview() {
    let server = MockServer::start().await;
    let payload = json!({
        "files": [
            {"name": "App.tsx", "content": "export default App;", "language": "typescript"},
            {"name": "Home.tsx", "content": "export const Home = () => null;", "language": "typescript"},
            {"name": "global.css", "content": "body { margin: 0; }", "language": "css"},
            {"name": "preview.html", "content": "<html><body>Torra</body></html>", "language": "html"}
        ]
    });

    Mock::given(method("POST"))
        .and(path("/models/builder:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&payload.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let proposal = codeset_studio::mock::sample_proposal("Torra");
    let site = gateway(&server).generate_files(&proposal).await.unwrap();

    assert_eq!(site.source_files.names(), vec!["App.tsx", "Home.tsx", "global.css"]);
    assert_eq!(site.preview_document, "<html><body>Torra</body></html>");
}

#[tokio::test]
async fn revise_files_sends_current_files() {
    let server = MockServer::start().await;
    let payload = json!({"files": [{"name": "App.tsx", "content": "blue"}]});

    Mock::given(method("POST"))
        .and(path("/models/builder:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&payload.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let files = codeset_studio::mock::sample_files();
    let revised = gateway(&server)
        .revise_files(&codeset_studio::mock::sample_proposal("Torra"), &files, "make it blue")
        .await
        .unwrap();
    assert_eq!(revised.names(), vec!["App.tsx"]);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("FILE: Home.tsx"));
    assert!(prompt.contains("make it blue"));
}

#[tokio::test]
async fn synthesize_asset_returns_inline_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/imager:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(inline_response("image/png", "aGVsbG8=")))
        .expect(1)
        .mount(&server)
        .await;

    let image = gateway(&server).synthesize_asset("espresso cup").await.unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.bytes().unwrap(), b"hello");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["contents"][0]["parts"][0]["text"],
        "High-end commercial photography, professional lighting, minimal: espresso cup"
    );
}

#[tokio::test]
async fn synthesize_asset_without_image_part() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("I cannot draw that.")))
        .mount(&server)
        .await;

    let err = gateway(&server).synthesize_asset("logo").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoAssetProduced);
}

#[tokio::test]
async fn strategy_audio_requests_two_speakers() {
    let server = MockServer::start().await;
    let pcm = codeset_studio::pcm::encode_base64_pcm16(&[0.0, 0.5, -0.5]);

    Mock::given(method("POST"))
        .and(path("/models/speaker:generateContent"))
        .and(body_partial_json(json!({"generationConfig": {"responseModalities": ["AUDIO"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(inline_response("audio/pcm;rate=24000", &pcm)))
        .expect(1)
        .mount(&server)
        .await;

    let clip = gateway(&server)
        .synthesize_strategy_audio(&codeset_studio::mock::sample_proposal("Torra"))
        .await
        .unwrap();
    assert_eq!(clip.samples().unwrap().len(), 3);
}
