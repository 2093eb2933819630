// UI layer: one handler per CLI command plus the formatting functions that
// turn typed API results into terminal text. Handlers own no state; they take
// the `Settings` built in `main`, call the API client once, and print.
//
// Formatting is kept separate from printing so it can be checked in tests
// without a terminal.

use crate::api::{
    ApiClient, DeleteResult, KeyRequest, ListItem, ListKind, ListQuery, ListResult, ShortenOptions,
    ShortenResult, UploadOptions, UploadResult, UrlStats,
};
use crate::config::Settings;
use crate::error::ClientError;
use crate::expiry;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Utc};
use crossterm::style::{style, Color, Stylize};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filename and extension used for content piped through stdin.
const STDIN_FILENAME: &str = "paste.txt";
const STDIN_EXT: &str = "txt";

/// Terminal colours. Disabled when stdout is not a terminal or `NO_COLOR`
/// is set, so piped output stays plain.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn detect() -> Self {
        Palette {
            color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn plain() -> Self {
        Palette { color: false }
    }

    fn paint(&self, text: &str, color: Color, bold: bool, underline: bool) -> String {
        if !self.color {
            return text.to_string();
        }
        let mut styled = style(text).with(color);
        if bold {
            styled = styled.bold();
        }
        if underline {
            styled = styled.underlined();
        }
        styled.to_string()
    }

    fn title(&self, text: &str) -> String {
        self.paint(text, Color::White, true, false)
    }

    fn url(&self, text: &str) -> String {
        self.paint(text, Color::Blue, false, true)
    }

    fn muted(&self, text: &str) -> String {
        self.paint(text, Color::Grey, false, false)
    }

    fn ok(&self) -> String {
        self.paint("✓", Color::Green, true, false)
    }

    fn fail(&self) -> String {
        self.paint("✗", Color::Red, true, false)
    }

    fn field(&self, key: &str, value: &str) -> String {
        format!("{}: {}", self.paint(key, Color::Magenta, true, false), value)
    }
}

/// Run `op` while a spinner is drawn on stderr. indicatif hides the spinner
/// when stderr is not a terminal.
fn with_spinner<T>(message: &'static str, op: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = op();
    spinner.finish_and_clear();
    out
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

pub fn config_set(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    settings.set(key, value)?;
    let p = Palette::detect();
    println!("{} {} set to {}", p.ok(), p.title(key), p.muted(value));
    Ok(())
}

pub fn config_get(settings: &Settings, key: &str) -> Result<()> {
    match settings.get(key) {
        Some(value) => println!("{}", value),
        None => println!("Config key '{}' not found", key),
    }
    Ok(())
}

pub fn config_list(settings: &Settings) -> Result<()> {
    let p = Palette::detect();
    println!("{}", p.title("Current Configuration"));
    println!("{}", p.muted(&format!("({})", settings.path().display())));
    println!();
    for (key, value) in settings.list() {
        println!("{}", p.field(key.as_str(), &value));
    }
    Ok(())
}

/// Removing a key that was never set prints an error-shaped line but is not
/// a failure.
pub fn config_unset(settings: &mut Settings, key: &str) -> Result<()> {
    let p = Palette::detect();
    if settings.unset(key)? {
        println!("{} Removed config key {}", p.ok(), p.title(key));
    } else {
        println!("{} Config key '{}' not found", p.fail(), key);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// upload / shorten / list / delete
// ---------------------------------------------------------------------------

/// Upload a file, or stdin when `file` is `None`.
pub fn upload(settings: &Settings, file: Option<&Path>, mut opts: UploadOptions) -> Result<()> {
    if opts.private && settings.api_key().is_none() {
        return Err(ClientError::private_upload_requires_key().into());
    }
    if opts.expires.is_none() {
        opts.expires = settings.default_expiry();
    }
    let content = match file {
        Some(path) => {
            fill_names_from_path(&mut opts, path);
            std::fs::read(path).map_err(|source| ClientError::Io {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => {
            fill_names_for_stdin(&mut opts);
            read_stdin()?
        }
    };

    let api = ApiClient::from_settings(settings)?;
    let result = with_spinner("Uploading...", || api.upload(content, &opts))?;

    let p = Palette::detect();
    println!("{} {}", p.ok(), p.title("Upload successful!"));
    println!();
    println!("{}", format_upload(&result, &p));
    Ok(())
}

fn fill_names_from_path(opts: &mut UploadOptions, path: &Path) {
    if opts.filename.is_none() {
        opts.filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    if opts.ext.is_none() {
        opts.ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    }
}

fn fill_names_for_stdin(opts: &mut UploadOptions) {
    opts.filename.get_or_insert_with(|| STDIN_FILENAME.to_string());
    opts.ext.get_or_insert_with(|| STDIN_EXT.to_string());
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(ClientError::Validation(
            "nothing to upload: pass a file or pipe content through stdin".into(),
        )
        .into());
    }
    let mut content = Vec::new();
    stdin.read_to_end(&mut content).map_err(|source| ClientError::Io {
        path: PathBuf::from("<stdin>"),
        source,
    })?;
    Ok(content)
}

pub fn shorten(settings: &Settings, mut opts: ShortenOptions) -> Result<()> {
    if opts.expires.is_none() {
        opts.expires = settings.default_expiry();
    }
    let api = ApiClient::from_settings(settings)?;
    let result = with_spinner("Shortening...", || api.shorten(&opts))?;

    let p = Palette::detect();
    println!("{} {}", p.ok(), p.title("URL shortened successfully!"));
    println!();
    println!("{}", format_shorten(&result, &p));
    Ok(())
}

pub fn list(settings: &Settings, query: &ListQuery) -> Result<()> {
    let api = ApiClient::from_settings(settings)?;
    let result = with_spinner("Fetching...", || api.list(query))?;
    print!("{}", format_list(query.kind, &result, &Palette::detect()));
    Ok(())
}

pub fn delete(settings: &Settings, id: &str) -> Result<()> {
    let api = ApiClient::from_settings(settings)?;
    let result = with_spinner("Deleting...", || api.delete(id))?;
    println!("{}", format_delete(&result, &Palette::detect())?);
    Ok(())
}

pub fn stats(settings: &Settings, id: &str) -> Result<()> {
    let api = ApiClient::from_settings(settings)?;
    let result = with_spinner("Fetching...", || api.url_stats(id))?;
    println!("{}", format_stats(&result, &Palette::detect()));
    Ok(())
}

pub fn expire(settings: &Settings, id: &str, expires: &str) -> Result<()> {
    let api = ApiClient::from_settings(settings)?;
    let result = with_spinner("Updating...", || api.update_url_expiration(id, expires))?;

    let p = Palette::detect();
    println!("{} {}", p.ok(), p.title("Expiration updated"));
    println!();
    println!("{}", format_shorten(&result, &p));
    Ok(())
}

// ---------------------------------------------------------------------------
// key
// ---------------------------------------------------------------------------

/// Request a new API key. Missing email/name are prompted for when running
/// interactively.
pub fn key_request(settings: &Settings, email: Option<String>, name: Option<String>) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt("Email")?,
    };
    let name = match name {
        Some(n) => n,
        None => prompt("Name")?,
    };

    let api = ApiClient::from_settings(settings)?;
    let result = with_spinner("Requesting key...", || {
        api.request_api_key(&KeyRequest { email, name })
    })?;

    let p = Palette::detect();
    println!("{} {}", p.ok(), p.title(&result.message));
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return Err(ClientError::Validation("email and name are required".into()).into());
    }
    Input::new()
        .with_prompt(label)
        .interact_text()
        .with_context(|| format!("reading {}", label.to_lowercase()))
}

pub fn key_status(settings: &Settings) -> Result<()> {
    println!("{}", format_key_status(settings.api_key().as_deref(), &Palette::detect()));
    Ok(())
}

// ---------------------------------------------------------------------------
// formatting
// ---------------------------------------------------------------------------

fn date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// The service encodes "no expiry" either as a missing field or as the zero
/// timestamp (year 1).
fn expiry_date(ts: Option<&DateTime<Utc>>) -> String {
    match ts {
        Some(ts) if ts.year() > 1 => date(ts),
        _ => "never".to_string(),
    }
}

/// Byte count in decimal units, e.g. `1.5 kB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
    if bytes < 1000 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

pub fn format_upload(r: &UploadResult, p: &Palette) -> String {
    let mut lines = vec![
        p.title(&r.filename),
        p.url(&r.url),
        p.field("Created", &date(&r.created_at)),
        p.field("Expires", &expiry_date(r.expires_at.as_ref())),
        p.field("Size", &format_size(r.size)),
        p.field("ID", &r.id),
    ];
    if r.private {
        lines.push(p.field("Private", "yes"));
    }
    lines.push(String::new());
    lines.push(p.muted("Additional URLs:"));
    lines.push(p.field("Raw", &p.url(&r.raw_url)));
    lines.push(p.field("Download", &p.url(&r.download_url)));
    lines.push(p.field("Delete", &p.url(&r.delete_url)));
    lines.join("\n")
}

pub fn format_shorten(r: &ShortenResult, p: &Palette) -> String {
    let mut lines = vec![p.url(&r.short_url), p.muted(&format!("→ {}", r.url))];
    if let Some(title) = r.title.as_deref().filter(|t| !t.is_empty()) {
        lines.push(p.field("Title", title));
    }
    lines.push(p.field("Created", &date(&r.created_at)));
    lines.push(p.field("Expires", &expiry_date(r.expires_at.as_ref())));
    lines.push(p.field("Clicks", &r.clicks.to_string()));
    lines.push(p.field("ID", &r.id));
    lines.push(String::new());
    lines.push(p.field("Delete", &p.url(&r.delete_url)));
    lines.join("\n")
}

fn format_list_item(kind: ListKind, item: &ListItem, p: &Palette) -> String {
    let created = date(&item.created_at);
    let expires = expiry_date(item.expires_at.as_ref());
    match kind {
        ListKind::Pastes => {
            let name = item
                .filename
                .as_deref()
                .or(item.title.as_deref())
                .unwrap_or(&item.id);
            let size = match item.size {
                Some(s) if s > 0 => format_size(s),
                _ => "-".to_string(),
            };
            let mut text = format!(
                "{}\n{}\n{}",
                p.title(name),
                p.url(&item.url),
                p.muted(&format!(
                    "Created: {} • Expires: {} • Size: {} • ID: {}",
                    created, expires, size, item.id
                ))
            );
            push_delete_url(&mut text, item, p);
            text
        }
        ListKind::Urls => {
            let short = item.short_url.as_deref().unwrap_or(&item.url);
            let mut text = format!("{}\n{}", p.url(short), p.muted(&format!("→ {}", item.url)));
            if let Some(title) = item.title.as_deref().filter(|t| !t.is_empty()) {
                text.push('\n');
                text.push_str(&p.title(title));
            }
            text.push('\n');
            text.push_str(&p.muted(&format!(
                "Created: {} • Expires: {} • Clicks: {} • ID: {}",
                created,
                expires,
                item.clicks.unwrap_or(0),
                item.id
            )));
            push_delete_url(&mut text, item, p);
            text
        }
    }
}

fn push_delete_url(text: &mut String, item: &ListItem, p: &Palette) {
    if let Some(delete_url) = item.delete_url.as_deref().filter(|d| !d.is_empty()) {
        text.push('\n');
        text.push_str(&p.field("Delete", &p.url(delete_url)));
    }
}

pub fn format_list(kind: ListKind, r: &ListResult, p: &Palette) -> String {
    if r.items.is_empty() {
        let what = match kind {
            ListKind::Pastes => "No uploaded pastes found",
            ListKind::Urls => "No shortened URLs found",
        };
        return format!("{}\n", p.muted(what));
    }

    let heading = match kind {
        ListKind::Pastes => "Your Uploaded Pastes",
        ListKind::Urls => "Your Shortened URLs",
    };
    let mut out = format!("{}\n\n", p.title(heading));
    for item in &r.items {
        out.push_str(&format_list_item(kind, item, p));
        out.push_str("\n\n");
    }
    out.push_str(&p.muted(&format!(
        "Page {} of {} (showing {} of {} total)",
        r.page,
        r.page_count(),
        r.items.len(),
        r.total
    )));
    out.push('\n');
    out
}

/// A 2xx answer can still report `success: false`; that is a failed delete.
pub fn format_delete(r: &DeleteResult, p: &Palette) -> Result<String> {
    let message = r.message.as_deref().filter(|m| !m.is_empty());
    if !r.success {
        return Err(anyhow!(
            "delete failed: {}",
            message.unwrap_or("the service refused the request")
        ));
    }
    let message = message.unwrap_or("Content deleted successfully!");
    Ok(format!("{} {}", p.ok(), p.title(message)))
}

pub fn format_stats(r: &UrlStats, p: &Palette) -> String {
    let last_click = r
        .last_click
        .as_ref()
        .map(date)
        .unwrap_or_else(|| "never".to_string());
    [
        p.url(&r.short_url),
        p.muted(&format!("→ {}", r.url)),
        p.field("Clicks", &r.clicks.to_string()),
        p.field("Last click", &last_click),
        p.field("Created", &date(&r.created_at)),
        p.field("Expires", &expiry_date(r.expires_at.as_ref())),
        p.field("ID", &r.id),
    ]
    .join("\n")
}

pub fn format_key_status(api_key: Option<&str>, p: &Palette) -> String {
    match api_key {
        Some(key) => [
            format!("{} {}", p.ok(), p.title("API Key Configuration")),
            String::new(),
            p.field("API Key", key),
            p.field("Max Expiry", &format!("{} days", expiry::MAX_DAYS_WITH_KEY)),
            p.field("Private Pastes", "Enabled"),
        ]
        .join("\n"),
        None => [
            format!("{} {}", p.fail(), p.title("No API key configured")),
            String::new(),
            p.field("Max Expiry", &format!("{} days", expiry::MAX_DAYS_ANONYMOUS)),
            p.field("Private Pastes", "Disabled"),
            String::new(),
            p.muted("Run '0x45 key request --email you@example.com --name \"Your Name\"' to request a key"),
        ]
        .join("\n"),
    }
}
