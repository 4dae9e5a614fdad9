use crate::eval;
use crate::movegen::MoveGenerator;
use crate::perft;
use crate::search::Searcher;
use crate::state::Position;
use crate::time::TimeControl;
use crate::tt::DEFAULT_TT_MB;
use log::{debug, info};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

pub const ENGINE_NAME: &str = "Kapok 1.0";
pub const ENGINE_AUTHOR: &str = "the kapok developers";

pub struct Engine {
    pub pos: Position,
    pub searcher: Searcher,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            pos: Position::new(),
            searcher: Searcher::new(DEFAULT_TT_MB),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

fn join_search(handle: &mut Option<thread::JoinHandle<()>>, stop: &Arc<AtomicBool>) {
    if let Some(h) = handle.take() {
        stop.store(true, Ordering::Relaxed);
        let _ = h.join();
    }
}

pub fn uci_loop() {
    let stdin = io::stdin();
    let engine = Arc::new(Mutex::new(Engine::new()));
    let stop = engine.lock().expect("engine lock").searcher.stop_handle();
    let mut search_thread: Option<thread::JoinHandle<()>> = None;

    let mut buffer = String::new();
    loop {
        buffer.clear();
        match stdin.lock().read_line(&mut buffer) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        debug!("command: {}", line);
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "uci" => {
                println!("id name {}", ENGINE_NAME);
                println!("id author {}", ENGINE_AUTHOR);
                println!(
                    "option name Hash type spin default {} min 1 max 1024",
                    DEFAULT_TT_MB
                );
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => {
                join_search(&mut search_thread, &stop);
                let mut eng = engine.lock().expect("engine lock");
                eng.pos.set_start();
                eng.searcher.clear_game();
            }
            "position" => {
                join_search(&mut search_thread, &stop);
                let mut eng = engine.lock().expect("engine lock");
                handle_position(&mut eng.pos, &parts);
            }
            "go" => {
                join_search(&mut search_thread, &stop);
                stop.store(false, Ordering::Relaxed);

                let (max_depth, tc) = parse_go(&parts);
                let engine_ref = Arc::clone(&engine);
                search_thread = Some(thread::spawn(move || {
                    let mut eng = engine_ref.lock().expect("engine lock");
                    let Engine { pos, searcher } = &mut *eng;
                    let (ms, infinite) = match tc.allocation_ms(pos.side_to_move) {
                        Some(ms) => (ms as i64, false),
                        None => (0, true),
                    };
                    let best = searcher.think(pos, max_depth, ms, infinite);
                    println!("bestmove {}", best);
                }));
            }
            "stop" => join_search(&mut search_thread, &stop),
            "setoption" => {
                if parts.len() >= 5
                    && parts[1] == "name"
                    && parts[2].eq_ignore_ascii_case("hash")
                    && parts[3] == "value"
                {
                    if let Ok(mb) = parts[4].parse::<usize>() {
                        join_search(&mut search_thread, &stop);
                        let mut eng = engine.lock().expect("engine lock");
                        let used = eng.searcher.set_tt_size(mb);
                        info!("hash resized to {} MB", used);
                        if used != mb {
                            println!("info string hash set to {} MB instead of {}", used, mb);
                        }
                    }
                }
            }
            "perft" => {
                let depth = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                let mut eng = engine.lock().expect("engine lock");
                let start = Instant::now();
                perft::perft_divide(&mut eng.pos, depth);
                println!("time: {} ms", start.elapsed().as_millis());
            }
            "eval" => {
                let eng = engine.lock().expect("engine lock");
                println!("eval: {}", eval::evaluate(&eng.pos));
            }
            "moves" => {
                let eng = engine.lock().expect("engine lock");
                let mut gen = MoveGenerator::new();
                gen.generate_moves(&eng.pos);
                let mut out = String::from("legal moves:");
                for i in 0..gen.list.count {
                    out.push(' ');
                    out.push_str(&gen.list.moves[i].to_string());
                }
                println!("{}", out);
            }
            "display" | "d" => {
                let eng = engine.lock().expect("engine lock");
                print!("{}", eng.pos.display());
            }
            "quit" => {
                join_search(&mut search_thread, &stop);
                break;
            }
            // Anything unrecognized produces no output.
            _ => {}
        }
    }
}

fn handle_position(pos: &mut Position, parts: &[&str]) {
    if parts.len() < 2 {
        return;
    }

    let mut idx = 2;
    match parts[1] {
        "startpos" => pos.set_start(),
        "fen" => {
            let mut fen = String::new();
            while idx < parts.len() && parts[idx] != "moves" {
                fen.push_str(parts[idx]);
                fen.push(' ');
                idx += 1;
            }
            if let Err(e) = pos.set_fen(fen.trim()) {
                debug!("position ignored: {}", e);
                return;
            }
        }
        _ => return,
    }

    if idx < parts.len() && parts[idx] == "moves" {
        for token in &parts[idx + 1..] {
            if let Err(e) = pos.make_coord_move(token) {
                debug!("move '{}' ignored: {}", token, e);
                break;
            }
        }
    }
}

fn parse_go(parts: &[&str]) -> (i32, TimeControl) {
    let mut depth: i32 = 0;
    let mut movetime: Option<u64> = None;
    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut infinite = false;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if let Some(v) = parts.get(i + 1).and_then(|s| s.parse().ok()) {
                    depth = v;
                }
                i += 1;
            }
            "movetime" => {
                movetime = parts.get(i + 1).and_then(|s| s.parse().ok());
                i += 1;
            }
            "wtime" => {
                wtime = parts.get(i + 1).and_then(|s| s.parse().ok());
                i += 1;
            }
            "btime" => {
                btime = parts.get(i + 1).and_then(|s| s.parse().ok());
                i += 1;
            }
            "winc" | "binc" | "movestogo" => i += 1, // recognized, unused
            "infinite" => infinite = true,
            _ => {}
        }
        i += 1;
    }

    let tc = if infinite {
        TimeControl::Infinite
    } else if let Some(ms) = movetime {
        TimeControl::MoveTime(ms)
    } else if wtime.is_some() || btime.is_some() {
        TimeControl::GameTime {
            wtime: wtime.unwrap_or(0),
            btime: btime.unwrap_or(0),
        }
    } else {
        // Bare `go`, with or without a depth limit, searches until told
        // to stop.
        TimeControl::Infinite
    };

    (depth, tc)
}
