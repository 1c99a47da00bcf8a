//! Parses a PGN file and prints what the viewer would load

use chess_academy_core::{prepare_upload, read_pgn_file, Config, Replayer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: pgn_inspect <file.pgn>");
        std::process::exit(1);
    });

    let config = Config::from_env();

    let text = match read_pgn_file(&path, &config).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let payload = match prepare_upload(text, &config) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("Failed to parse {}: {}", path, e);
            std::process::exit(1);
        }
    };

    println!(
        "{} games ({} valid, {} with errors, {} bytes)\n",
        payload.metadata.total_games,
        payload.metadata.valid_games,
        payload.metadata.games_with_errors,
        payload.metadata.estimated_size
    );
    for warning in &payload.warnings {
        println!("warning: {}", warning);
    }

    for (i, (game, validation)) in payload.games.iter().zip(&payload.validations).enumerate() {
        println!("  #{} {}", i + 1, game.summary());

        let mut replayer = Replayer::new();
        let history = replayer.load_game(game);
        println!(
            "    Moves: {} | Replayed: {} | Fallback: {}",
            game.move_count,
            history.len(),
            game.is_manually_parsed
        );
        if let Some(last) = history.last() {
            println!("    Final position: {}", last.fen);
        }
        for error in &validation.errors {
            println!("    error: {}", error);
        }
        for warning in &validation.warnings {
            println!("    warning: {}", warning);
        }
        println!();
    }
}
