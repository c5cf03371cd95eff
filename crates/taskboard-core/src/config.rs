use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow,
  bail
};
use reqwest::Url;
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const DEFAULT_REMOTE_URL: &str =
  "https://jsonplaceholder.typicode.com";

/// Validated settings. Every key is checked when it is read, so a bad
/// value fails startup instead of the first remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub data_location:  PathBuf,
  pub remote_url:     Url,
  pub remote_enabled: bool,
  /// Per-request limit. Unset means a hung call never resolves, and a
  /// one-shot command waits for it before exiting.
  pub remote_timeout: Option<Duration>,
  pub color:          bool
}

/// One `key = value` pair and where it came from.
#[derive(Debug, Clone)]
pub struct Setting {
  pub key:    String,
  pub value:  String,
  pub origin: String
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_location:  expand_tilde(
        Path::new("~/.todo")
      ),
      remote_url:     default_remote_url(),
      remote_enabled: true,
      remote_timeout: None,
      color:          true
    }
  }
}

impl Config {
  /// Reads the todorc (if any), then applies `overrides` on top.
  #[tracing::instrument(skip(
    todorc_override,
    overrides
  ))]
  pub fn load<I>(
    todorc_override: Option<&Path>,
    overrides: I
  ) -> anyhow::Result<Self>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    let mut settings = Vec::new();

    if let Some(path) =
      resolve_todorc_path(
        todorc_override
      )
    {
      info!(todorc = %path.display(), "loading todorc");
      settings
        .extend(read_rc_file(&path)?);
    } else {
      debug!(
        "no todorc found; using \
         defaults"
      );
    }

    settings.extend(
      overrides.into_iter().map(
        |(k, v)| {
          let key = k
            .strip_prefix("rc.")
            .unwrap_or(k.as_str())
            .to_string();
          Setting {
            origin: format!(
              "override {key}"
            ),
            key,
            value: v
          }
        }
      )
    );

    Self::from_settings(settings)
  }

  pub fn from_settings<I>(
    settings: I
  ) -> anyhow::Result<Self>
  where
    I: IntoIterator<Item = Setting>
  {
    let mut cfg = Config::default();
    for setting in settings {
      cfg
        .apply(
          &setting.key,
          &setting.value
        )
        .with_context(|| {
          format!(
            "invalid setting at {}",
            setting.origin
          )
        })?;
    }
    Ok(cfg)
  }

  fn apply(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let value = value.trim();
    trace!(key, value, "applying setting");
    match key {
      | "data.location" => {
        if value.is_empty() {
          bail!(
            "data.location cannot be \
             empty"
          );
        }
        self.data_location =
          expand_tilde(Path::new(value));
      }
      | "remote.url" => {
        self.remote_url =
          parse_remote_url(value)?;
      }
      | "remote.enabled" => {
        self.remote_enabled =
          parse_switch(key, value)?;
      }
      | "remote.timeout" => {
        self.remote_timeout =
          parse_timeout(value)?;
      }
      | "color" => {
        self.color =
          parse_switch(key, value)?;
      }
      | other => {
        warn!(key = other, "ignoring unknown setting");
      }
    }
    Ok(())
  }
}

/// The `--data` flag wins over `data.location`. The directory itself is
/// created by the datastore.
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> PathBuf {
  override_dir
    .map(Path::to_path_buf)
    .unwrap_or_else(|| {
      cfg.data_location.clone()
    })
}

fn resolve_todorc_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(todorc_env) =
    std::env::var("TODORC")
  {
    if todorc_env == "/dev/null" {
      return None;
    }
    return Some(PathBuf::from(
      todorc_env
    ));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping ~/.todorc"
    );
    return None;
  };
  let candidate = home.join(".todorc");
  candidate.exists().then_some(candidate)
}

/// `key = value` lines; `#` starts a comment.
fn read_rc_file(
  path: &Path
) -> anyhow::Result<Vec<Setting>> {
  let path = expand_tilde(path);
  let text = fs::read_to_string(&path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;

  let mut settings = Vec::new();
  for (line_num, raw_line) in
    text.lines().enumerate()
  {
    let line = raw_line
      .split_once('#')
      .map_or(raw_line, |(before, _)| {
        before
      })
      .trim();
    if line.is_empty() {
      continue;
    }

    let origin = format!(
      "{}:{}",
      path.display(),
      line_num + 1
    );
    let (k, v) =
      line.split_once('=').ok_or_else(
        || {
          anyhow!(
            "invalid config line \
             {origin}: {raw_line}"
          )
        }
      )?;

    settings.push(Setting {
      key: k.trim().to_string(),
      value: v.trim().to_string(),
      origin
    });
  }

  debug!(file = %path.display(), count = settings.len(), "read todorc");
  Ok(settings)
}

fn default_remote_url() -> Url {
  Url::parse(DEFAULT_REMOTE_URL)
    .unwrap_or_else(|_| {
      unreachable!(
        "default remote url is valid"
      )
    })
}

fn parse_remote_url(
  value: &str
) -> anyhow::Result<Url> {
  let url =
    Url::parse(value).with_context(
      || format!("remote.url: {value}")
    )?;
  match url.scheme() {
    | "http" | "https" => Ok(url),
    | other => {
      bail!(
        "remote.url must be http or \
         https, got {other}"
      )
    }
  }
}

fn parse_timeout(
  value: &str
) -> anyhow::Result<Option<Duration>> {
  if value.is_empty() {
    return Ok(None);
  }
  let secs =
    value.parse::<u64>().with_context(
      || {
        format!(
          "remote.timeout: expected \
           seconds, got {value}"
        )
      }
    )?;
  Ok(Some(Duration::from_secs(secs)))
}

fn parse_switch(
  key: &str,
  value: &str
) -> anyhow::Result<bool> {
  match value
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | _ => {
      bail!(
        "{key}: expected on/off, got \
         {value}"
      )
    }
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
