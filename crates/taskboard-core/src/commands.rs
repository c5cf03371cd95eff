use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument};

use crate::cli::{Command, ShellCommand, ShellLine};
use crate::controller::{Action, Controller, NewTaskForm};
use crate::datastore::DataStore;
use crate::remote::Remote;
use crate::render::Renderer;

/// Turns a one-shot command into the action it performs. `None` for commands
/// that only read.
pub fn action_for(command: &Command) -> Option<Action> {
    match command {
        Command::List { category } => category.map(Action::SelectTab),
        Command::Tab { category } => Some(Action::SelectTab(*category)),
        Command::Add {
            category,
            stage,
            text,
        } => Some(Action::Submit(NewTaskForm::new(
            text.join(" "),
            *category,
            *stage,
        ))),
        Command::Edit { id, text } => Some(Action::Edit {
            id: *id,
            text: text.join(" "),
        }),
        Command::Stage { id, stage } => Some(Action::SetStage {
            id: *id,
            stage: *stage,
        }),
        Command::Delete { id } => Some(Action::Remove { id: *id }),
        Command::Shell | Command::Export => None,
    }
}

/// Runs one command against a freshly initialised controller, then waits for
/// the remote calls it started. `input` is only read by `shell`.
#[instrument(skip(datastore, remote, renderer, input, out))]
pub async fn dispatch<R, I, W>(
    datastore: DataStore,
    remote: R,
    renderer: &Renderer,
    command: Option<Command>,
    input: I,
    mut out: W,
) -> anyhow::Result<()>
where
    R: Remote,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let mut controller = Controller::init(datastore, remote).await?;
    let command = command.unwrap_or(Command::List { category: None });
    debug!(?command, "dispatching command");

    match command {
        Command::Shell => run_shell(&mut controller, renderer, input, &mut out).await?,
        Command::Export => cmd_export(&controller, &mut out)?,
        other => apply_and_show(&mut controller, renderer, &other, &mut out)?,
    }
    out.flush()?;

    let outcomes = controller.settle().await;
    info!(
        remote_calls = outcomes.len(),
        applied = outcomes.iter().filter(|o| o.is_applied()).count(),
        "done"
    );
    Ok(())
}

fn apply_and_show<R: Remote, W: Write>(
    controller: &mut Controller<R>,
    renderer: &Renderer,
    command: &Command,
    out: &mut W,
) -> anyhow::Result<()> {
    let view = match action_for(command) {
        Some(action) => controller.handle(action)?,
        None => controller.render(),
    };
    renderer.write_view(out, controller.tabs(), &view)
}

fn cmd_export<R: Remote, W: Write>(controller: &Controller<R>, out: &mut W) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(controller.store().tasks())?;
    writeln!(out, "{json}")?;
    Ok(())
}

/// Reads commands line by line until `quit` or end of input. Remote calls
/// keep running while the next line is awaited; they are not settled here.
#[instrument(skip_all)]
pub async fn run_shell<R, I, W>(
    controller: &mut Controller<R>,
    renderer: &Renderer,
    input: I,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: Remote,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    info!("starting interactive shell");
    renderer.write_view(&mut *out, controller.tabs(), &controller.render())?;
    out.flush()?;

    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed reading shell input")?
    {
        let command = match ShellLine::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                write!(out, "{err}")?;
                out.flush()?;
                continue;
            }
        };

        let command = match command {
            ShellCommand::Quit => break,
            ShellCommand::Board(command) => command,
        };

        match command {
            Command::Shell => writeln!(out, "already in the shell")?,
            Command::Export => cmd_export(controller, out)?,
            other => apply_and_show(controller, renderer, &other, out)?,
        }
        out.flush()?;
    }

    debug!("shell input closed");
    Ok(())
}
