use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use postfold::config::SourceConfig;
use postfold::html_source::{HtmlPageSource, PageOrigin};
use postfold::media::MediaArchiver;

static PIXEL_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 252, 255, 23, 0, 2, 3, 1, 128,
    110, 220, 25, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

fn spawn_media_server(
    hits: Arc<AtomicUsize>,
) -> (String, mpsc::Sender<()>, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };
            hits.fetch_add(1, Ordering::SeqCst);

            let path = request.url().split('?').next().unwrap_or_default().to_owned();
            let response = match path.as_str() {
                "/media/photo.png" => tiny_http::Response::from_data(PIXEL_PNG.to_vec()),
                _ => tiny_http::Response::from_data(b"not found".to_vec()).with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    (base_url, shutdown_tx, handle)
}

fn source() -> HtmlPageSource {
    let config = SourceConfig {
        user_agent: "postfold-test".to_owned(),
        cookie: None,
        delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
    };
    HtmlPageSource::new(PageOrigin::File("unused.html".into()), config).expect("build source")
}

#[tokio::test]
async fn archiving_twice_fetches_once() -> anyhow::Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let (base_url, shutdown_tx, handle) = spawn_media_server(Arc::clone(&hits));
    let temp = tempfile::TempDir::new()?;
    let archiver = MediaArchiver::new(temp.path().join("img"), "/img/linkedin");
    let source = source();
    let url = format!("{base_url}/media/photo.png?e=1");

    let first = archiver.archive(&source, &url, "900").await;
    let second = archiver.archive(&source, &url, "900").await;

    let _ = shutdown_tx.send(());
    let _ = handle.join();

    let first = first.expect("first archive");
    assert_eq!(Some(first.clone()), second);
    assert!(first.starts_with("/img/linkedin/900-"));
    assert!(first.ends_with(".png"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let asset = archiver.plan(&url, "900").expect("plan");
    assert_eq!(std::fs::read(asset.local_path)?, PIXEL_PNG);
    Ok(())
}

#[tokio::test]
async fn failed_fetch_returns_none_and_leaves_no_file() -> anyhow::Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let (base_url, shutdown_tx, handle) = spawn_media_server(Arc::clone(&hits));
    let temp = tempfile::TempDir::new()?;
    let media_dir = temp.path().join("img");
    let archiver = MediaArchiver::new(&media_dir, "/img/linkedin");
    let source = source();

    let missing = archiver
        .archive(&source, &format!("{base_url}/media/gone.jpg"), "901")
        .await;

    let _ = shutdown_tx.send(());
    let _ = handle.join();

    assert_eq!(missing, None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(media_dir.is_dir(), "media dir is created even when the fetch fails");
    assert_eq!(std::fs::read_dir(&media_dir)?.count(), 0);
    Ok(())
}
