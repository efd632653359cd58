use mln_study_hub::orchestrator::{App, Command};
use mln_study_hub::services::MindmapService;
use mln_study_hub::utils::logging;
use mln_study_hub::{AiError, Config, GeminiClient, GenerationConfig, SyncStrategy, TextGenerator};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};

/// 模型回复：带代码围栏的思维导图 JSON
const FENCED_MINDMAP: &str = r#"{"candidates":[{"content":{"parts":[{"text":"```json\n{\"topic\":\"giai cấp\",\"nodes\":[{\"id\":\"root\",\"name\":\"giai cấp\",\"children\":[{\"id\":\"n1\",\"name\":\"Nguồn gốc\",\"children\":[]},{\"id\":\"n2\",\"name\":\"Đấu tranh giai cấp\",\"children\":[]}]}]}\n```"}]}}]}"#;

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// 本地桩服务：只应答一次，返回 base url 和收到的原始请求
async fn serve_once(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{}", addr), handle)
}

fn stub_config(base_url: &str) -> Config {
    Config {
        gemini_api_key: Some("test-key".to_string()),
        gemini_api_base_url: base_url.to_string(),
        courtesy_delay_ms: 0,
        sync_strategy: SyncStrategy::InMemory,
        data_dir: std::env::temp_dir().join(format!(
            "mln_study_hub_it_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        )),
        ..Config::default()
    }
}

fn stub_client(config: &Config) -> GeminiClient {
    GeminiClient::new(config)
        .unwrap()
        .with_http_client(reqwest::Client::builder().no_proxy().build().unwrap())
}

#[tokio::test]
async fn test_mindmap_end_to_end() {
    logging::init(true);

    let (base, server) = serve_once(200, FENCED_MINDMAP).await;
    let config = stub_config(&base);
    let service = MindmapService::new(Arc::new(stub_client(&config)), Duration::ZERO);

    let mindmap = service.generate("giai cấp").await.expect("生成思维导图失败");
    assert_eq!(mindmap.topic, "giai cấp");
    assert_eq!(mindmap.nodes[0].children.len(), 2);
    assert_eq!(mindmap.depth(), 2);

    let state = service.state();
    assert!(!state.loading);
    assert!(state.error.is_none());

    let request = server.await.unwrap();
    assert!(request.contains("### Main Topic or Input\\ngiai cấp"));
    assert!(request.contains("\"maxOutputTokens\":900"));
}

#[tokio::test]
async fn test_mindmap_upstream_fault_clears_data() {
    let (base, _server) = serve_once(500, r#"{"error":{"message":"internal"}}"#).await;
    let config = stub_config(&base);
    let service = MindmapService::new(Arc::new(stub_client(&config)), Duration::ZERO);

    let err = assert_err!(service.generate("giai cấp").await);
    assert_eq!(err.status(), Some(500));
    assert!(matches!(err, AiError::Service { .. }));

    let state = service.state();
    assert!(state.data.is_none());
    assert_eq!(
        state.error.as_deref(),
        Some("Lỗi server của Gemini. Vui lòng thử lại sau (HTTP 500)")
    );
}

#[tokio::test]
async fn test_app_runs_mindmap_command() {
    let (base, server) = serve_once(200, FENCED_MINDMAP).await;
    let config = stub_config(&base);
    let dir = config.data_dir.clone();
    let generator: Arc<dyn TextGenerator> = Arc::new(stub_client(&config));

    let app = assert_ok!(App::initialize(config).await).with_generator(generator);
    assert_ok!(
        app.run(Command::Mindmap {
            topic: "giai cấp".to_string(),
        })
        .await
    );
    let request = server.await.unwrap();
    assert!(request.contains("\"temperature\":0.2"));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
#[ignore] // 需要真实 API key：cargo test -- --ignored
async fn test_live_generate() {
    logging::init(true);

    let config = Config::from_env().expect("加载配置失败");
    let client = GeminiClient::new(&config).expect("未配置 GEMINI_API_KEY");

    let text = client
        .generate("Giai cấp là gì? Trả lời một câu.", &GenerationConfig::new(0.2, 100))
        .await
        .expect("调用 Gemini 失败");
    assert!(!text.is_empty());
}
