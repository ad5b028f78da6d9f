//! Upload a local video through a running authorization service.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;

use video_drop::client::session::{NotificationKind, Status};
use video_drop::client::{
    HttpAuthorizationClient, HttpTransport, UploadForm, UploadOutcome, VideoFile,
};

#[derive(Parser, Debug)]
#[command(name = "upload")]
#[command(about = "Upload a video straight to storage using a presigned form")]
struct Args {
    /// Base URL of the authorization service, e.g. http://127.0.0.1:8080
    #[arg(long, value_name = "URL")]
    endpoint: String,

    /// Seconds without transfer progress before giving up (0 waits forever)
    #[arg(long, default_value = "120")]
    stall_timeout: u64,

    /// Bytes per progress step
    #[arg(long, default_value = "65536")]
    chunk_size: usize,

    /// Video file to upload
    path: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = Args::parse();

    let file = match VideoFile::from_path(&args.path).await {
        Ok(file) => file,
        Err(err) => {
            log::error!("Error reading {}: {}", args.path.display(), err);
            std::process::exit(1);
        }
    };

    let client = reqwest::Client::new();
    let authorizer = HttpAuthorizationClient::new(client.clone(), &args.endpoint);
    let transport = HttpTransport::new(client).with_chunk_size(args.chunk_size);
    let stall_timeout = (args.stall_timeout > 0).then(|| Duration::from_secs(args.stall_timeout));

    let mut last_reported = 0;
    let mut form = UploadForm::new(authorizer, transport)
        .with_stall_timeout(stall_timeout)
        .with_observer(move |session| {
            if session.status() == Status::Uploading && session.progress() > last_reported {
                last_reported = session.progress();
                log::info!("Uploaded {}%", last_reported);
            }
        });

    log::info!(
        "Uploading {} ({} bytes, {})",
        file.name(),
        file.len(),
        file.content_type()
    );
    form.select_file(file);
    let outcome = form.submit().await;

    for notification in form.take_notifications() {
        match notification.kind {
            NotificationKind::Success => log::info!("{}", notification.message),
            NotificationKind::Failure => log::error!("{}", notification.message),
        }
    }

    match outcome {
        UploadOutcome::Succeeded => {}
        UploadOutcome::Skipped => {
            log::error!("Nothing to upload: {} is empty", args.path.display());
            std::process::exit(1);
        }
        UploadOutcome::Failed(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }
}
