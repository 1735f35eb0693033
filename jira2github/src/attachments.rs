//! Attachment transfer.
//!
//! Enumerates attachment descriptors across the export and downloads
//! each one through a scheduler tuned for byte transfers rather than
//! metadata calls. Destination paths are derived deterministically from
//! project key, issue key and filename.

use crate::schedule::{Scheduler, SchedulerConfig};
use crate::source::SourceIssue;
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Errors for a single attachment download.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Request failure against the attachment host.
    #[error("download error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure writing the downloaded content.
    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One attachment to transfer.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentDescriptor {
    /// Download location on the source tracker.
    pub source: String,

    /// Local destination path.
    pub destination: PathBuf,

    pub size: u64,

    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// Options for an attachment transfer run.
#[derive(Debug, Clone)]
pub struct AttachmentOptions {
    /// Root directory for downloaded attachments.
    pub output_path: PathBuf,

    /// Enumerate descriptors without transferring anything.
    pub dry_run: bool,

    /// Scheduler settings for the transfer phase.
    pub scheduler: SchedulerConfig,
}

impl AttachmentOptions {
    /// Creates options with the transfer-phase scheduler defaults:
    /// byte transfers get double the usual dispatch spacing.
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            dry_run: false,
            scheduler: SchedulerConfig {
                min_time: Duration::from_millis(200),
                ..SchedulerConfig::default()
            },
        }
    }
}

/// Result of an attachment transfer run.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentReport {
    /// Every descriptor enumerated, in discovery order.
    pub attachments: Vec<AttachmentDescriptor>,

    /// Downloads that completed.
    pub downloaded: usize,

    /// Descriptions of downloads that failed.
    pub failures: Vec<String>,

    pub dry_run: bool,
}

/// Enumerates attachment descriptors for the export.
///
/// Discovery order is the order of each issue's attachment list; the
/// destination is always `<output>/<project key>/<issue key>/<filename>`.
pub fn compile_attachments(issues: &[SourceIssue], output_path: &Path) -> Vec<AttachmentDescriptor> {
    issues
        .iter()
        .flat_map(|issue| {
            issue.attachments.iter().map(|attachment| AttachmentDescriptor {
                source: attachment.content.clone(),
                destination: output_path
                    .join(&issue.project_key)
                    .join(&issue.key)
                    .join(&attachment.filename),
                size: attachment.size,
                mime_type: attachment.mime_type.clone(),
            })
        })
        .collect()
}

/// Transfers every attachment in the export.
///
/// In dry-run mode only the descriptor list is computed. Otherwise each
/// download is scheduled individually; a failed download is recorded and
/// the run continues.
pub async fn fetch_attachments(
    client: &reqwest::Client,
    issues: &[SourceIssue],
    options: &AttachmentOptions,
) -> AttachmentReport {
    let attachments = compile_attachments(issues, &options.output_path);
    info!(
        count = attachments.len(),
        dry_run = options.dry_run,
        "Begin retrieving attachments"
    );

    let mut report = AttachmentReport {
        downloaded: 0,
        failures: Vec::new(),
        dry_run: options.dry_run,
        attachments,
    };

    if options.dry_run {
        return report;
    }

    let scheduler = Scheduler::new(options.scheduler.clone());
    for descriptor in &report.attachments {
        let result = scheduler
            .run(|| retrieve_attachment(client, descriptor))
            .await;
        match result {
            Ok(()) => report.downloaded += 1,
            Err(error) => {
                warn!(
                    source = %descriptor.source,
                    error = %error,
                    "Attachment download failed"
                );
                report.failures.push(format!(
                    "{}: {error}",
                    descriptor.destination.display()
                ));
            }
        }
    }

    info!(
        downloaded = report.downloaded,
        failed = report.failures.len(),
        "Completed retrieving attachments"
    );
    report
}

/// Downloads one attachment to its destination path.
async fn retrieve_attachment(
    client: &reqwest::Client,
    descriptor: &AttachmentDescriptor,
) -> Result<(), AttachmentError> {
    let response = client
        .get(&descriptor.source)
        .send()
        .await?
        .error_for_status()?;

    // Directory creation is idempotent.
    if let Some(parent) = descriptor.destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| AttachmentError::Io {
                path: parent.display().to_string(),
                source,
            })?;
    }

    let mut file = tokio::fs::File::create(&descriptor.destination)
        .await
        .map_err(|source| AttachmentError::Io {
            path: descriptor.destination.display().to_string(),
            source,
        })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|source| AttachmentError::Io {
                path: descriptor.destination.display().to_string(),
                source,
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceAttachment;

    fn issue_with_attachments(key: &str, names: &[&str]) -> SourceIssue {
        SourceIssue {
            key: key.to_string(),
            link: format!("https://tracker.example.com/browse/{key}"),
            project_key: "FLUID".to_string(),
            summary: "s".to_string(),
            description: String::new(),
            environment: None,
            components: vec![],
            creator: None,
            assignee: None,
            reporter: None,
            comments: vec![],
            attachments: names
                .iter()
                .map(|name| SourceAttachment {
                    filename: name.to_string(),
                    size: 1,
                    mime_type: None,
                    content: format!("https://tracker.example.com/attachment/{name}"),
                })
                .collect(),
            issue_type: "Bug".to_string(),
            labels: vec![],
            issue_links: vec![],
            subtasks: vec![],
            parent: None,
            versions: vec![],
            fix_versions: vec![],
            status_category: String::new(),
            resolution: None,
            created: "2020-01-01T00:00:00.000+0000".to_string(),
        }
    }

    #[test]
    fn destinations_are_deterministic() {
        let issues = vec![
            issue_with_attachments("FLUID-1", &["a.png", "b.log"]),
            issue_with_attachments("FLUID-2", &["c.txt"]),
        ];

        let descriptors = compile_attachments(&issues, Path::new("out"));
        let destinations: Vec<String> = descriptors
            .iter()
            .map(|d| d.destination.display().to_string())
            .collect();

        assert_eq!(
            destinations,
            vec![
                "out/FLUID/FLUID-1/a.png",
                "out/FLUID/FLUID-1/b.log",
                "out/FLUID/FLUID-2/c.txt",
            ]
        );
    }

    #[tokio::test]
    async fn failed_downloads_are_recorded_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let mut issues = vec![issue_with_attachments("FLUID-1", &["a.png", "b.log"])];
        // Unreachable scheme: every download fails before hitting the wire.
        for attachment in &mut issues[0].attachments {
            attachment.content = "unix://invalid".to_string();
        }

        let client = reqwest::Client::new();
        let mut options = AttachmentOptions::new(dir.path().to_path_buf());
        options.scheduler = SchedulerConfig {
            min_time: Duration::from_millis(1),
            ..SchedulerConfig::default()
        };

        let report = fetch_attachments(&client, &issues, &options).await;
        assert_eq!(report.downloaded, 0);
        assert_eq!(report.failures.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_only_enumerates() {
        let issues = vec![issue_with_attachments("FLUID-1", &["a.png"])];
        let client = reqwest::Client::new();
        let options = AttachmentOptions {
            dry_run: true,
            ..AttachmentOptions::new(PathBuf::from("out"))
        };

        let report = fetch_attachments(&client, &issues, &options).await;
        assert!(report.dry_run);
        assert_eq!(report.attachments.len(), 1);
        assert_eq!(report.downloaded, 0);
        assert!(report.failures.is_empty());
    }
}
