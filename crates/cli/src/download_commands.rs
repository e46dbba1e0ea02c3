use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    clap::Args,
    tracing::info,
};

use {
    folio_config::FolioConfig,
    folio_download::{BatchDownloader, HttpFetcher, Manifest, Progress, asset_from_url},
    folio_media::{mime::sniff_mime, normalize_with_quality},
};

#[derive(Args)]
pub struct DownloadArgs {
    /// JSON manifest listing the items to fetch.
    pub manifest: PathBuf,
    /// Collection name used as the filename prefix. Defaults to the
    /// manifest's `collection`, then to the manifest file name.
    #[arg(long, short)]
    pub collection: Option<String>,
    /// Output directory (overrides config value).
    #[arg(long, short)]
    pub out: Option<PathBuf>,
    /// Pause between items in milliseconds (overrides config value).
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// Print the batch report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// Source image: local path, `file://`, `http(s)://` or `data:` URL.
    pub input: String,
    /// Where to write the JPEG.
    pub output: PathBuf,
    /// Declared MIME type of the input. Sniffed from the bytes when omitted.
    #[arg(long)]
    pub mime: Option<String>,
}

pub async fn handle_download(args: DownloadArgs, mut config: FolioConfig) -> Result<()> {
    if let Some(out) = args.out {
        config.output.dir = out;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.download.delay_ms = delay_ms;
    }

    let manifest = Manifest::load(&args.manifest).await?;
    let collection =
        resolve_collection(args.collection, manifest.collection.clone(), &args.manifest);

    let fetcher = HttpFetcher::from_config(&config.download)?;
    let items = manifest.into_items(fetcher.client())?;
    let batch = BatchDownloader::from_config_with_fetcher(&config, Arc::new(fetcher));

    info!(
        collection = %collection,
        items = items.len(),
        out = %config.output.dir.display(),
        delay = ?Duration::from_millis(config.download.delay_ms),
        "starting download"
    );

    let mut on_progress = |p: Progress| eprintln!("[{}/{}]", p.current, p.total);
    let report = batch
        .download_all(&items, &collection, Some(&mut on_progress))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for saved in &report.succeeded {
            println!("saved  {}", saved.path.display());
        }
        for failed in &report.failed {
            println!("failed {} ({})", failed.filename, failed.error);
        }
    }
    eprintln!(
        "{} of {} saved to {}",
        report.succeeded.len(),
        report.attempted(),
        config.output.dir.display()
    );

    if report.all_failed() {
        anyhow::bail!("every item in '{}' failed to download", report.collection);
    }
    Ok(())
}

pub async fn handle_normalize(args: NormalizeArgs, config: &FolioConfig) -> Result<()> {
    let fetcher = HttpFetcher::from_config(&config.download)?;
    let asset = asset_from_url(&args.input, fetcher.client())?;
    let raw = asset
        .bytes()
        .await
        .with_context(|| format!("failed to read {}", args.input))?;

    let mime = args
        .mime
        .or_else(|| sniff_mime(&raw).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".into());
    let quality = config.download.jpeg_quality;
    let normalized =
        tokio::task::spawn_blocking(move || normalize_with_quality(raw, &mime, quality)).await??;

    tokio::fs::write(&args.output, &normalized.data)
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let action = if normalized.transcoded {
        "transcoded"
    } else {
        "copied"
    };
    eprintln!(
        "{action} {} -> {} ({} bytes)",
        args.input,
        args.output.display(),
        normalized.data.len()
    );
    Ok(())
}

/// Explicit flag, then manifest field, then manifest file stem.
fn resolve_collection(
    flag: Option<String>,
    from_manifest: Option<String>,
    manifest_path: &std::path::Path,
) -> String {
    let named = |c: &String| !c.trim().is_empty();
    flag.filter(named)
        .or(from_manifest.filter(named))
        .or_else(|| {
            manifest_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "collection".into())
}
