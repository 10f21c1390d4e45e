//! Console commands

use anyhow::{anyhow, bail, Context};
use clap::Subcommand;
use std::fmt::Write as _;
use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use thainest_content::schema::ALL;
use thainest_content::{
    AdminConsole, Attachment, AutoConfirm, Confirm, DeleteOutcome, ItemDraft, RowId,
    SectionSynchronizer, StatusKind, StatusUpdate,
};

/// Console commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the editable sections
    Sections,

    /// Load a section and print its fields and lists
    Show {
        section: String,
    },

    /// Edit fields and save the section
    Set {
        section: String,
        /// field=value pairs
        #[arg(value_parser = parse_assignment, required = true)]
        values: Vec<(String, String)>,
    },

    /// Edit one row of a list
    Row {
        section: String,
        list: String,
        index: usize,
        /// field=value pairs
        #[arg(value_parser = parse_assignment, required = true)]
        values: Vec<(String, String)>,
    },

    /// Append a row to a local list and save the section
    AddRow {
        section: String,
        list: String,
        /// field=value pairs for the new row
        #[arg(value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },

    /// Remove a row from a local list and save the section
    RemoveRow {
        section: String,
        list: String,
        index: usize,
    },

    /// Upload a new item to a list
    Add {
        section: String,
        list: String,
        /// SVG file to upload
        #[arg(short, long)]
        file: PathBuf,
        /// field=value pairs sent with the file
        #[arg(value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },

    /// Delete an item from a list
    Delete {
        section: String,
        list: String,
        index: usize,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Replace the image behind an asset slot
    Upload {
        section: String,
        slot: String,
        /// Slot index (center images: 0 or 1)
        #[arg(short, long, default_value = "0")]
        index: usize,
        /// SVG file to upload
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Parse `field=value`.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected field=value, got `{s}`"))
}

/// Asks on the terminal.
///
/// The read runs through `block_in_place`, so it needs the multi-threaded
/// runtime; other tasks keep running while the prompt waits.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tokio::task::block_in_place(|| {
            eprint!("{prompt} [y/N] ");
            let _ = std::io::stderr().flush();
            read_answer(&mut std::io::stdin().lock())
        })
    }
}

fn read_answer(input: &mut impl BufRead) -> bool {
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Run a command on its own task, leaving the caller free to print status
/// updates while it runs.
pub fn spawn_command(
    console: Arc<AdminConsole>,
    command: Commands,
    confirm: Arc<dyn Confirm>,
) -> JoinHandle<anyhow::Result<String>> {
    tokio::spawn(async move { execute_command(&console, command, confirm.as_ref()).await })
}

/// Run a command and return its output.
pub async fn execute_command(
    console: &AdminConsole,
    command: Commands,
    confirm: &dyn Confirm,
) -> anyhow::Result<String> {
    match command {
        Commands::Sections => Ok(format_sections()),

        Commands::Show { section } => {
            let sync = load(console, &section).await?;
            format_section(&sync).await
        }

        Commands::Set { section, values } => {
            let sync = load(console, &section).await?;
            for (field, value) in values {
                sync.set_field(&field, value).await?;
            }
            Ok(sync.save().await?)
        }

        Commands::Row {
            section,
            list,
            index,
            values,
        } => {
            let sync = load(console, &section).await?;
            let row = row_at(&sync, &list, index).await?;
            for (field, value) in values {
                sync.set_row_field(&list, row, &field, value).await?;
            }

            // Sections without a document save push rows one at a time.
            if sync.schema().envelope.is_none() {
                Ok(sync.update_list_item(&list, index).await?)
            } else {
                Ok(sync.save().await?)
            }
        }

        Commands::AddRow {
            section,
            list,
            values,
        } => {
            let sync = load(console, &section).await?;
            let row = sync.add_row(&list).await?;
            for (field, value) in values {
                sync.set_row_field(&list, row, &field, value).await?;
            }
            Ok(sync.save().await?)
        }

        Commands::RemoveRow {
            section,
            list,
            index,
        } => {
            let sync = load(console, &section).await?;
            let row = row_at(&sync, &list, index).await?;
            sync.remove_row(&list, row).await?;
            Ok(sync.save().await?)
        }

        Commands::Add {
            section,
            list,
            file,
            values,
        } => {
            let sync = load(console, &section).await?;
            let attachment = Attachment::from_path(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let mut draft = values
                .into_iter()
                .fold(ItemDraft::new(), |draft, (k, v)| draft.with_field(k, v))
                .with_attachment(attachment);
            Ok(sync.add_list_item(&list, &mut draft).await?)
        }

        Commands::Delete {
            section,
            list,
            index,
            yes,
        } => {
            let sync = load(console, &section).await?;
            let skip = AutoConfirm(true);
            let confirm: &dyn Confirm = if yes { &skip } else { confirm };

            match sync.delete_list_item(&list, index, confirm).await? {
                DeleteOutcome::Deleted(reply) => Ok(reply),
                DeleteOutcome::Declined => Ok("Cancelled".to_string()),
            }
        }

        Commands::Upload {
            section,
            slot,
            index,
            file,
        } => {
            let sync = load(console, &section).await?;
            let attachment = Attachment::from_path(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let reply = sync.upload_asset(&slot, index, attachment).await?;
            let url = sync.asset_url(&slot, index)?;
            Ok(format!("{reply}\n{url}"))
        }
    }
}

/// One line per status change; idle transitions are not shown.
pub fn format_update(update: &StatusUpdate) -> Option<String> {
    let status = update.status.as_ref()?;
    let label = match status.kind {
        StatusKind::Loading => "…",
        StatusKind::Success => "✓",
        StatusKind::Error => "✗",
    };
    Some(format!("[{}] {} {}", update.key, label, status.message))
}

async fn load(console: &AdminConsole, key: &str) -> anyhow::Result<Arc<SectionSynchronizer>> {
    let sync = console
        .section(key)
        .ok_or_else(|| anyhow!("unknown section `{key}` (see `thainest-admin sections`)"))?;
    sync.load().await?;
    Ok(sync)
}

async fn row_at(
    sync: &SectionSynchronizer,
    list: &str,
    index: usize,
) -> anyhow::Result<RowId> {
    let rows = sync.rows(list).await?;
    match rows.get(index) {
        Some(row) => Ok(row.id),
        None => bail!("{list} has {} rows, no row {index}", rows.len()),
    }
}

fn format_sections() -> String {
    let mut out = String::new();
    for schema in ALL {
        let lists: Vec<_> = schema.lists.iter().map(|l| l.name).collect();
        let assets: Vec<_> = schema.assets.iter().map(|a| a.name).collect();
        let _ = write!(out, "{:<12} {:<22}", schema.key, schema.path);
        if !lists.is_empty() {
            let _ = write!(out, " lists: {}", lists.join(", "));
        }
        if !assets.is_empty() {
            let _ = write!(out, " assets: {}", assets.join(", "));
        }
        out.push('\n');
    }
    out
}

async fn format_section(sync: &SectionSynchronizer) -> anyhow::Result<String> {
    let schema = sync.schema();
    let state = sync.state().await;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} ({}) sha={}",
        schema.key,
        schema.path,
        state.token().unwrap_or("-")
    );

    for (name, value) in state.fields(schema) {
        if value.contains('\n') {
            let _ = writeln!(out, "  {name}:");
            for line in value.lines() {
                let _ = writeln!(out, "    {line}");
            }
        } else {
            let _ = writeln!(out, "  {name} = {value}");
        }
    }

    for list in schema.lists {
        let rows = state.rows(list.name);
        let _ = writeln!(out, "  {} ({}):", list.name, rows.len());
        for (index, row) in rows.iter().enumerate() {
            let fields: Vec<_> = list
                .item_fields
                .iter()
                .map(|f| format!("{f}={}", row.get(f)))
                .collect();
            let _ = writeln!(out, "    [{index}] {}", fields.join(" "));
            if let Some(url) = sync.row_image_url(list.name, row.id).await? {
                let _ = writeln!(out, "        {url}");
            }
        }
    }

    for slot in schema.assets {
        let _ = writeln!(out, "  asset {}: {}", slot.name, sync.asset_url(slot.name, 0)?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use thainest_content::{ConsoleSettings, MemoryStore, Status};

    fn console(store: Arc<MemoryStore>) -> AdminConsole {
        AdminConsole::new(store, ConsoleSettings::default())
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("facebook.url=https://fb.com/a=b").unwrap(),
            ("facebook.url".to_string(), "https://fb.com/a=b".to_string())
        );
        assert!(parse_assignment("title").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_format_update_skips_idle() {
        let shown = StatusUpdate {
            key: "contact".into(),
            status: Some(Status {
                kind: StatusKind::Error,
                message: "sha mismatch".into(),
            }),
        };
        assert_eq!(format_update(&shown).unwrap(), "[contact] ✗ sha mismatch");

        let idle = StatusUpdate {
            key: "contact".into(),
            status: None,
        };
        assert!(format_update(&idle).is_none());
    }

    #[test]
    fn test_read_answer() {
        assert!(read_answer(&mut "y\n".as_bytes()));
        assert!(read_answer(&mut " YES \n".as_bytes()));
        assert!(!read_answer(&mut "n\n".as_bytes()));
        assert!(!read_answer(&mut "".as_bytes()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_updates_flow_while_prompt_waits() {
        let store = Arc::new(
            MemoryStore::new()
                .with_untracked_document("slides", json!({ "slides": [{ "headline": "A" }] }))
                .with_list_route("slides", "slides", "/slides", "image"),
        );
        let console = Arc::new(console(store.clone()));
        let mut events = console.subscribe();

        // The prompt only says yes once the caller has printed an update.
        let (printed_tx, printed_rx) = std::sync::mpsc::channel::<()>();
        let printed_rx = std::sync::Mutex::new(printed_rx);
        let confirm = move |_: &str| {
            tokio::task::block_in_place(|| {
                printed_rx
                    .lock()
                    .unwrap()
                    .recv_timeout(std::time::Duration::from_secs(5))
                    .is_ok()
            })
        };

        let command = Commands::Delete {
            section: "slides".into(),
            list: "slides".into(),
            index: 0,
            yes: false,
        };
        let run = spawn_command(console.clone(), command, Arc::new(confirm));

        let update = events.recv().await.unwrap();
        assert!(format_update(&update).is_some());
        printed_tx.send(()).unwrap();

        let out = run.await.unwrap().unwrap();
        assert_ne!(out, "Cancelled");
        assert_eq!(store.count("POST", "slides/delete").await, 1);
    }

    #[tokio::test]
    async fn test_set_saves_section() {
        let store = Arc::new(
            MemoryStore::new().with_document("contact-config", json!({ "phone": "1" })),
        );
        let console = console(store.clone());

        let command = Commands::Set {
            section: "contact".into(),
            values: vec![("phone".into(), "02-123-4567".into())],
        };
        execute_command(&console, command, &AutoConfirm(false))
            .await
            .unwrap();

        let doc = store.document("contact-config").await.unwrap();
        assert_eq!(doc["phone"], "02-123-4567");
    }

    #[tokio::test]
    async fn test_add_row_fills_template_and_saves() {
        let store = Arc::new(
            MemoryStore::new().with_document("contact-config", json!({ "operationHours": [] })),
        );
        let console = console(store.clone());

        let command = Commands::AddRow {
            section: "contact".into(),
            list: "operationHours".into(),
            values: vec![("day".into(), "Sat".into())],
        };
        execute_command(&console, command, &AutoConfirm(false))
            .await
            .unwrap();

        let doc = store.document("contact-config").await.unwrap();
        assert_eq!(doc["operationHours"], json!([{ "day": "Sat", "time": "" }]));
    }

    #[tokio::test]
    async fn test_declined_delete_is_cancelled() {
        let store = Arc::new(
            MemoryStore::new()
                .with_untracked_document("slides", json!({ "slides": [{ "headline": "A" }] }))
                .with_list_route("slides", "slides", "/slides", "image"),
        );
        let console = console(store.clone());

        let command = Commands::Delete {
            section: "slides".into(),
            list: "slides".into(),
            index: 0,
            yes: false,
        };
        let out = execute_command(&console, command, &AutoConfirm(false))
            .await
            .unwrap();

        assert_eq!(out, "Cancelled");
        assert_eq!(store.count("POST", "slides/delete").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_section_is_an_error() {
        let console = console(Arc::new(MemoryStore::new()));
        let command = Commands::Show {
            section: "vouchers".into(),
        };
        assert!(execute_command(&console, command, &AutoConfirm(true))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_show_lists_rows_with_image_urls() {
        let store = Arc::new(MemoryStore::new().with_document(
            "aboutus-content",
            json!({ "nurturingTitle": "Nurture", "serviceCards": [{ "image": "spa.svg", "alt": "Spa" }] }),
        ));
        let console = console(store);

        let out = execute_command(
            &console,
            Commands::Show {
                section: "aboutus".into(),
            },
            &AutoConfirm(false),
        )
        .await
        .unwrap();

        assert!(out.starts_with("aboutus (aboutus-content) sha=v1"));
        assert!(out.contains("nurturingTitle = Nurture"));
        assert!(out.contains("[0] image=spa.svg alt=Spa"));
        assert!(out.contains("/src/components/Aboutus/spa.svg?"));
    }
}
