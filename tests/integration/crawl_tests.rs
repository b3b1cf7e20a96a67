//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetcher, discovery, and full runs end-to-end. A recording sleeper stands
//! in for real waiting so timing is asserted exactly.

use sillage::config::{Config, DelayRange};
use sillage::crawler::{
    Coordinator, Discoverer, Fetcher, RecordingSleeper, TokioSleeper, MIN_THROTTLE_WAIT,
};
use sillage::output::{FilePersistence, OutputError, OutputResult, Persistence};
use sillage::record::ItemRecord;
use sillage::state::RunPhase;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration pointed at the mock server, with no politeness delays
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.discovery.site_url = base_url.to_string();
    config.discovery.search_url = format!("{}/buscar/?query={{key}}", base_url);
    config.discovery.keys = vec!["a".to_string()];
    config.delays.after_fetch = DelayRange::zero();
    config.delays.between_keys = DelayRange::zero();
    config.delays.between_items = DelayRange::zero();
    config
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_secs).collect()
}

fn item_page(name: &str) -> String {
    format!(
        r#"<html><body>
            <h1 itemprop="name">{} <small>para Mujeres</small></h1>
            <div class="grid-x">
                <div class="accord-bar">floral</div>
                <div class="accord-bar">dulce</div>
            </div>
            <div class="grid-x"><div class="accord-bar">floral</div></div>
            <span itemprop="ratingValue">4.05</span>
            <div id="pyramid">
                <h4><b>Notas de Salida</b></h4>
                <pyramid-level><div style="margin: 0.2rem"><a href="/n/1"></a>Pera</div></pyramid-level>
                <h4><b>Notas de Corazón</b></h4>
                <pyramid-level><div style="margin: 0.2rem"><a href="/n/2"></a>Jazmín</div></pyramid-level>
                <h4><b>Notas de Base</b></h4>
                <pyramid-level><div style="margin: 0.2rem"><a href="/n/3"></a>Pachulí</div></pyramid-level>
            </div>
        </body></html>"#,
        name
    )
}

fn search_page(links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">item</a>"#, href))
        .collect();
    format!(
        r#"<html><body><a href="/noticias/1.html">news</a>{}</body></html>"#,
        anchors
    )
}

fn item_paths(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("/perfume/house-{:03}/item-{:03}.html", i, i))
        .collect()
}

async fn mount_search(server: &MockServer, key: &str, links: &[String]) {
    Mock::given(method("GET"))
        .and(path("/buscar/"))
        .and(query_param("query", key))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(links)))
        .mount(server)
        .await;
}

#[derive(Debug, Clone)]
struct Write {
    path: PathBuf,
    tabular: bool,
    records: Vec<ItemRecord>,
}

/// Persistence double that keeps every write in memory
#[derive(Default, Clone)]
struct MemoryPersistence {
    writes: Arc<Mutex<Vec<Write>>>,
    fail_tabular: bool,
}

impl MemoryPersistence {
    fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }
}

impl Persistence for MemoryPersistence {
    fn write_structured(&self, records: &[ItemRecord], path: &Path) -> OutputResult<()> {
        self.writes.lock().unwrap().push(Write {
            path: path.to_path_buf(),
            tabular: false,
            records: records.to_vec(),
        });
        Ok(())
    }

    fn write_tabular(&self, records: &[ItemRecord], path: &Path) -> OutputResult<()> {
        if self.fail_tabular {
            return Err(OutputError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.writes.lock().unwrap().push(Write {
            path: path.to_path_buf(),
            tabular: true,
            records: records.to_vec(),
        });
        Ok(())
    }
}

/// Serves a fixed response and trips the token while serving the Nth one
struct CancellingResponder {
    served: AtomicUsize,
    cancel_at: usize,
    cancel: CancellationToken,
    response: ResponseTemplate,
}

impl CancellingResponder {
    fn new(cancel_at: usize, cancel: &CancellationToken, response: ResponseTemplate) -> Self {
        Self {
            served: AtomicUsize::new(0),
            cancel_at,
            cancel: cancel.clone(),
            response,
        }
    }
}

impl Respond for CancellingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let served = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        if served == self.cancel_at {
            self.cancel.cancel();
        }
        self.response.clone()
    }
}

// ===== Fetcher =====

#[tokio::test]
async fn test_transient_failures_back_off_then_give_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    let page = fetcher.fetch(&format!("{}/flaky", mock_server.uri())).await;

    assert!(page.is_none());
    assert_eq!(sleeper.recorded(), secs(&[60, 120, 240, 300]));
}

#[tokio::test]
async fn test_throttle_waits_for_retry_after_hint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.max_retries = 1;
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    let page = fetcher.fetch(&format!("{}/item", mock_server.uri())).await;

    assert_eq!(page.unwrap().body, "<html>ok</html>");
    assert_eq!(sleeper.recorded(), secs(&[7]));
}

#[tokio::test]
async fn test_throttle_without_hint_uses_default_wait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    assert!(fetcher
        .fetch(&format!("{}/item", mock_server.uri()))
        .await
        .is_some());
    assert_eq!(sleeper.recorded(), secs(&[300]));
}

#[tokio::test]
async fn test_throttling_does_not_spend_retry_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.max_retries = 1;
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    assert!(fetcher
        .fetch(&format!("{}/item", mock_server.uri()))
        .await
        .is_some());
    assert_eq!(sleeper.recorded(), secs(&[1, 1, 1]));
}

#[tokio::test]
async fn test_throttle_retry_skips_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.max_retries = 2;
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    assert!(fetcher
        .fetch(&format!("{}/item", mock_server.uri()))
        .await
        .is_some());
    assert_eq!(sleeper.recorded(), secs(&[60, 2]));
}

#[tokio::test]
async fn test_zero_retry_after_still_waits() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    assert!(fetcher
        .fetch(&format!("{}/item", mock_server.uri()))
        .await
        .is_some());
    assert_eq!(sleeper.recorded(), vec![MIN_THROTTLE_WAIT]);
}

#[tokio::test]
async fn test_cancellation_stops_throttled_retries() {
    let mock_server = MockServer::start().await;
    let cancel = CancellationToken::new();

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(CancellingResponder::new(
            3,
            &cancel,
            ResponseTemplate::new(429).insert_header("Retry-After", "300"),
        ))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone()))
        .unwrap()
        .with_cancel(cancel);

    let page = tokio::time::timeout(
        Duration::from_secs(10),
        fetcher.fetch(&format!("{}/item", mock_server.uri())),
    )
    .await
    .expect("fetch should stop once cancelled");

    assert!(page.is_none());
    assert_eq!(sleeper.recorded(), secs(&[300, 300]));
}

#[tokio::test]
async fn test_cancellation_cuts_throttle_wait_short() {
    let mock_server = MockServer::start().await;
    let cancel = CancellationToken::new();

    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "300"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let fetcher = Fetcher::from_config(&config, Arc::new(TokioSleeper))
        .unwrap()
        .with_cancel(cancel.clone());

    let trip = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trip.cancel();
    });

    let page = tokio::time::timeout(
        Duration::from_secs(5),
        fetcher.fetch(&format!("{}/item", mock_server.uri())),
    )
    .await
    .expect("throttle wait should end on cancellation");

    assert!(page.is_none());
}

#[tokio::test]
async fn test_network_failure_resolves_to_none() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = format!("http://{}", addr);
    let mut config = create_test_config(&base_url);
    config.fetcher.max_retries = 2;
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    assert!(fetcher.fetch(&format!("{}/item", base_url)).await.is_none());
    assert_eq!(sleeper.recorded(), secs(&[60]));
}

#[tokio::test]
async fn test_success_applies_politeness_delay_and_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/item"))
        .and(header("user-agent", "TestHarvester/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.user_agent.value = "TestHarvester/1.0".to_string();
    config.delays.after_fetch = DelayRange::from_secs(5, 10);
    let sleeper = RecordingSleeper::new();
    let fetcher = Fetcher::from_config(&config, Arc::new(sleeper.clone())).unwrap();

    assert!(fetcher
        .fetch(&format!("{}/item", mock_server.uri()))
        .await
        .is_some());

    let waits = sleeper.recorded();
    assert_eq!(waits.len(), 1);
    assert!(waits[0] >= Duration::from_secs(5) && waits[0] <= Duration::from_secs(10));
}

// ===== Discovery =====

#[tokio::test]
async fn test_discovery_normalizes_and_deduplicates() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let authority = base_url.trim_start_matches("http:");

    mount_search(
        &mock_server,
        "a",
        &[
            format!("{}/perfume/Lancome/La-Vie-Est-Belle-14982.html", base_url),
            "/perfume/Lancome/La-Vie-Est-Belle-14982.html".to_string(),
            format!("{}/perfume/Lancome/La-Vie-Est-Belle-14982.html", authority),
            "/perfume/Lancome/Idole-55797.html".to_string(),
        ],
    )
    .await;

    let config = create_test_config(&base_url);
    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Arc::new(Fetcher::from_config(&config, sleeper.clone()).unwrap());
    let discoverer = Discoverer::new(fetcher, &config, sleeper).unwrap();

    let urls = discoverer
        .discover_all(&config.discovery.keys, &CancellationToken::new())
        .await;

    assert_eq!(
        urls,
        vec![
            format!("{}/perfume/Lancome/Idole-55797.html", base_url),
            format!("{}/perfume/Lancome/La-Vie-Est-Belle-14982.html", base_url),
        ]
    );
}

#[tokio::test]
async fn test_discovery_continues_past_failed_key() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_search(&mock_server, "a", &["/perfume/Dior/J-adore-210.html".to_string()]).await;

    Mock::given(method("GET"))
        .and(path("/buscar/"))
        .and(query_param("query", "b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    mount_search(
        &mock_server,
        "c",
        &[
            "/perfume/Chanel/Chance-610.html".to_string(),
            "/perfume/Dior/J-adore-210.html".to_string(),
        ],
    )
    .await;

    let mut config = create_test_config(&base_url);
    config.fetcher.max_retries = 1;
    config.discovery.keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    config.delays.between_keys = DelayRange::from_secs(2, 4);

    let sleeper = RecordingSleeper::new();
    let shared: Arc<RecordingSleeper> = Arc::new(sleeper.clone());
    let fetcher = Arc::new(Fetcher::from_config(&config, shared.clone()).unwrap());
    let discoverer = Discoverer::new(fetcher, &config, shared).unwrap();

    let urls = discoverer
        .discover_all(&config.discovery.keys, &CancellationToken::new())
        .await;

    assert_eq!(urls.len(), 2);

    // One politeness delay per successful key
    let waits = sleeper.recorded();
    assert_eq!(waits.len(), 2);
    assert!(waits
        .iter()
        .all(|w| *w >= Duration::from_secs(2) && *w <= Duration::from_secs(4)));
}

#[tokio::test]
async fn test_cancellation_ends_pause_between_keys() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_search(&mock_server, "a", &["/perfume/Dior/J-adore-210.html".to_string()]).await;

    Mock::given(method("GET"))
        .and(path("/buscar/"))
        .and(query_param("query", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.discovery.keys = vec!["a".to_string(), "b".to_string()];
    config.delays.between_keys = DelayRange::from_secs(600, 600);

    let sleeper: Arc<TokioSleeper> = Arc::new(TokioSleeper);
    let fetcher = Arc::new(Fetcher::from_config(&config, sleeper.clone()).unwrap());
    let discoverer = Discoverer::new(fetcher, &config, sleeper).unwrap();

    let cancel = CancellationToken::new();
    let trip = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trip.cancel();
    });

    let urls = tokio::time::timeout(
        Duration::from_secs(5),
        discoverer.discover_all(&config.discovery.keys, &cancel),
    )
    .await
    .expect("pause between keys should end on cancellation");

    assert_eq!(urls, vec![format!("{}/perfume/Dior/J-adore-210.html", base_url)]);
}

// ===== Full runs =====

#[tokio::test]
async fn test_interrupt_flushes_completed_items() {
    let mock_server = MockServer::start().await;
    let cancel = CancellationToken::new();

    mount_search(&mock_server, "a", &item_paths(100)).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/perfume/"))
        .respond_with(CancellingResponder::new(
            37,
            &cancel,
            ResponseTemplate::new(200).set_body_string(item_page("Item")),
        ))
        .expect(37)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let persistence = MemoryPersistence::default();
    let coordinator = Coordinator::new(
        &config,
        persistence.clone(),
        Arc::new(RecordingSleeper::new()),
        cancel,
    )
    .unwrap();
    let interrupted_path = coordinator.namer().interrupted();

    let report = coordinator.run().await;

    assert_eq!(report.outcome, RunPhase::Interrupted);
    assert_eq!(report.discovered, 100);
    assert_eq!(report.records, 37);

    let writes = persistence.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].path, interrupted_path);
    assert!(!writes[0].tabular);
    assert_eq!(writes[0].records.len(), 37);
}

#[tokio::test]
async fn test_full_run_checkpoints_and_final_artifacts() {
    let mock_server = MockServer::start().await;
    let output_dir = tempfile::TempDir::new().unwrap();

    let mut links = item_paths(100);
    links.extend((0..5).map(|i| format!("/perfume/gone/missing-{}.html", i)));
    mount_search(&mock_server, "a", &links).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/perfume/gone/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/perfume/house-"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_page("Idylle")))
        .expect(100)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.max_retries = 1;
    config.output.directory = output_dir.path().display().to_string();

    let coordinator = Coordinator::new(
        &config,
        FilePersistence::new(),
        Arc::new(RecordingSleeper::new()),
        CancellationToken::new(),
    )
    .unwrap();
    let namer = coordinator.namer().clone();

    let report = coordinator.run().await;

    assert_eq!(report.outcome, RunPhase::Completed);
    assert_eq!(report.discovered, 105);
    assert_eq!(report.records, 100);
    assert_eq!(report.skipped, 5);
    assert_eq!(
        report.artifacts,
        vec![
            namer.checkpoint(50),
            namer.checkpoint(100),
            namer.final_structured(),
            namer.final_tabular(),
        ]
    );

    let read_records = |path: PathBuf| -> Vec<ItemRecord> {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    };

    assert_eq!(read_records(namer.checkpoint(50)).len(), 50);
    assert_eq!(read_records(namer.checkpoint(100)).len(), 100);

    let records = read_records(namer.final_structured());
    assert_eq!(records.len(), 100);
    assert_eq!(records[0].name, "Idylle");
    assert_eq!(records[0].brand.as_deref(), Some("house 000"));
    assert_eq!(records[0].accords, vec!["floral", "dulce"]);
    assert_eq!(records[0].rating, Some(4.05));
    assert_eq!(records[0].scent_pyramid.heart, vec!["Jazmín"]);

    let csv = std::fs::read_to_string(namer.final_tabular()).unwrap();
    assert_eq!(csv.lines().count(), 101);

    let backups = std::fs::read_dir(output_dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("backup_"))
        .count();
    assert_eq!(backups, 2);
}

#[tokio::test]
async fn test_missing_rating_does_not_block_other_fields() {
    let mock_server = MockServer::start().await;

    mount_search(&mock_server, "a", &item_paths(1)).await;

    let page = item_page("Mon Guerlain").replace(r#"<span itemprop="ratingValue">4.05</span>"#, "");
    Mock::given(method("GET"))
        .and(path_regex(r"^/perfume/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let persistence = MemoryPersistence::default();
    let coordinator = Coordinator::new(
        &config,
        persistence.clone(),
        Arc::new(RecordingSleeper::new()),
        CancellationToken::new(),
    )
    .unwrap();

    let report = coordinator.run().await;
    assert_eq!(report.outcome, RunPhase::Completed);

    let writes = persistence.writes();
    let record = &writes[0].records[0];
    assert_eq!(record.rating, None);
    assert_eq!(record.name, "Mon Guerlain");
    assert_eq!(record.gender_from_title, "Mujeres");
    assert_eq!(record.scent_pyramid.top, vec!["Pera"]);
}

#[tokio::test]
async fn test_final_write_failure_saves_error_artifact() {
    let mock_server = MockServer::start().await;

    mount_search(&mock_server, "a", &item_paths(3)).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/perfume/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_page("Alien")))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let persistence = MemoryPersistence {
        fail_tabular: true,
        ..Default::default()
    };
    let coordinator = Coordinator::new(
        &config,
        persistence.clone(),
        Arc::new(RecordingSleeper::new()),
        CancellationToken::new(),
    )
    .unwrap();
    let namer = coordinator.namer().clone();

    let report = coordinator.run().await;

    assert_eq!(report.outcome, RunPhase::Failed);
    assert_eq!(report.records, 3);

    let writes = persistence.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].path, namer.final_structured());
    assert_eq!(writes[1].path, namer.error());
    assert_eq!(writes[1].records.len(), 3);
}

#[tokio::test]
async fn test_empty_discovery_completes() {
    let mock_server = MockServer::start().await;

    mount_search(&mock_server, "a", &[]).await;

    let config = create_test_config(&mock_server.uri());
    let persistence = MemoryPersistence::default();
    let coordinator = Coordinator::new(
        &config,
        persistence.clone(),
        Arc::new(RecordingSleeper::new()),
        CancellationToken::new(),
    )
    .unwrap();

    let report = coordinator.run().await;

    assert_eq!(report.outcome, RunPhase::Completed);
    assert_eq!(report.discovered, 0);

    let writes = persistence.writes();
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|w| w.records.is_empty()));
    assert!(writes[1].tabular);
}

#[tokio::test]
async fn test_endless_throttling_still_interrupts() {
    let mock_server = MockServer::start().await;
    let cancel = CancellationToken::new();

    mount_search(&mock_server, "a", &item_paths(3)).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/perfume/"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "300"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let persistence = MemoryPersistence::default();
    let coordinator = Coordinator::new(
        &config,
        persistence.clone(),
        Arc::new(TokioSleeper),
        cancel.clone(),
    )
    .unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), coordinator.run())
        .await
        .expect("run should end once cancelled");

    assert_eq!(report.outcome, RunPhase::Interrupted);
    assert_eq!(report.records, 0);
    assert_eq!(report.skipped, 0);

    let writes = persistence.writes();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].records.is_empty());
}
