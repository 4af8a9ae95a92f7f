//! Kanban board CLI.
//!
//! Manages a board document (`.board/board.json`) and applies card moves
//! through the reconciliation coordinator, the same path the UI server uses.

use std::path::Path;

use anyhow::Result;
use board::commands::{self, MoveReport};
use board::core::drag_ref::DragRef;
use board::core::types::{Board, BoardKind, CardId, ColumnId};
use board::exit_codes;
use board::io::init::{InitOptions, init_board};
use board::logging;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "board",
    version,
    about = "Kanban board engine with optimistic, reconciled card moves"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.board/` with a config and an empty board.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
        /// Column layout: `brands_crm` or `invites`.
        #[arg(long, default_value = "brands_crm")]
        kind: BoardKind,
    },
    /// Check the board against schema and invariants (single ownership, status tags).
    Validate,
    /// Print columns and their cards.
    Show {
        /// Print the board document as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Move a card to a column, optionally at an index.
    Move {
        card: String,
        column: String,
        #[arg(long)]
        index: Option<usize>,
    },
    /// Replay a drag: SOURCE is `column:card`, TARGET is `column` or `column:card`.
    Drop {
        #[arg(value_parser = parse_drag_ref)]
        source: DragRef,
        #[arg(value_parser = parse_drag_ref)]
        target: Option<DragRef>,
    },
}

fn parse_drag_ref(raw: &str) -> std::result::Result<DragRef, String> {
    DragRef::parse(raw).map_err(|err| err.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = Path::new(".");
    match cli.command {
        Command::Init { force, kind } => {
            init_board(root, &InitOptions { force, kind })?;
            Ok(exit_codes::OK)
        }
        Command::Validate => {
            commands::validate(root).await?;
            Ok(exit_codes::OK)
        }
        Command::Show { json } => {
            let board = commands::validate(root).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                print!("{}", render_columns(&board));
            }
            Ok(exit_codes::OK)
        }
        Command::Move {
            card,
            column,
            index,
        } => {
            let report =
                commands::move_card(root, &CardId::new(card), &ColumnId::new(column), index)
                    .await?;
            Ok(print_report(&report))
        }
        Command::Drop { source, target } => {
            let report = commands::drop_card(root, &source, target.as_ref()).await?;
            Ok(print_report(&report))
        }
    }
}

fn print_report(report: &MoveReport) -> i32 {
    match report {
        MoveReport::Unchanged => println!("unchanged"),
        MoveReport::Reordered(request) => println!(
            "reordered {} in {} (order is not persisted)",
            request.card, request.to
        ),
        MoveReport::Committed(request) => {
            println!("moved {} from {} to {}", request.card, request.from, request.to);
        }
        MoveReport::RolledBack { notices, .. } => {
            for notice in notices {
                eprintln!("{}", notice);
            }
        }
    }
    report.exit_code()
}

fn render_columns(board: &Board) -> String {
    let mut out = String::new();
    for column in &board.columns {
        out.push_str(&format!(
            "{} [{}] ({})\n",
            column.title,
            column.id,
            column.cards.len()
        ));
        for card in &column.cards {
            out.push_str(&format!("  {}  {}\n", card.id, card.name));
        }
    }
    out
}
