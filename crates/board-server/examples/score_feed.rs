//! Post a few scores to a running board-server and print what `/ws` pushes.
//!
//! ```text
//! cargo run -p board-server                        # terminal 1
//! cargo run -p board-server --example score_feed   # terminal 2
//! ```
//!
//! The server address defaults to `127.0.0.1:8080`; pass another as the
//! first argument.

use std::time::Duration;

use board_protocol::decode_snapshot;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const SCORES: &[(&str, i64)] = &[
    ("alice", 10),
    ("bob", 20),
    ("carol", 5),
    ("alice", 99),
    ("dave", 42),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await?;
    println!("subscribed to ws://{addr}/ws");

    let poster = {
        let addr = addr.clone();
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            for (name, score) in SCORES {
                tokio::time::sleep(Duration::from_millis(700)).await;
                let body = format!(r#"{{"name":"{name}","score":{score}}}"#);
                match client
                    .post(format!("http://{addr}/update"))
                    .body(body)
                    .send()
                    .await
                {
                    Ok(resp) => println!("POST {name}={score} -> {}", resp.status()),
                    Err(e) => eprintln!("POST {name}={score} failed: {e}"),
                }
            }
        })
    };

    let mut last = String::new();
    let deadline = tokio::time::sleep(Duration::from_secs(6));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    // Interval triggers repeat unchanged boards; show changes only.
                    if text == last {
                        continue;
                    }
                    println!("top:");
                    for (rank, entry) in decode_snapshot(&text)?.iter().enumerate() {
                        println!("  {:>2}. {:<12} {}", rank + 1, entry.name, entry.score);
                    }
                    last = text;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    poster.await?;
    Ok(())
}
