//! Interactive wallet client
//!
//! Connects to the wallet server, forwards stdin lines as commands, and
//! prints the replies. `help` is handled locally. The client exits when the
//! server answers with the disconnect sentinel (or goes away).

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use anyhow::Context;

use coinvault::dispatcher::DISCONNECT_SENTINEL;

const HELP: &str = "\
register <username> <password> - Register into the system
login <username> <password> - Login into your profile
deposit_money <amount_of_money> - Deposit money into your account
list_offerings - See information about currently available cryptocurrencies
buy <cryptoID> <invested_money> - Buy cryptocurrency into your wallet
sell <cryptoID> - Sell cryptocurrency from your wallet
get_wallet_summary - See your amount of money and currently active investments
get_wallet_overall_summary - See all your active and finished investments and your current profit/loss
disconnect - Save your current activity and exit";

/// Multi-tuple replies read better one field per line; the server joins
/// fields with spaces, so expand them for the query verbs.
fn expand_reply(message: &str, reply: &str) -> String {
    let verb = message.split_whitespace().next().unwrap_or("");
    let is_query = matches!(
        verb,
        "list_offerings" | "get_wallet_summary" | "get_wallet_overall_summary"
    );
    if is_query && reply.contains(':') {
        reply.replace(' ', "\n")
    } else {
        reply.to_string()
    }
}

fn main() -> anyhow::Result<()> {
    let host = std::env::var("HOST_NAME").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(7777);

    let stream = TcpStream::connect((host.as_str(), port))
        .with_context(|| format!("connect to {host}:{port}"))?;
    let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
    let mut writer = stream;

    println!("Connected to the server.");
    println!("You can enter help to see the instructions");

    let stdin = std::io::stdin();
    loop {
        print!("Enter message: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let message = input.trim();
        if message.is_empty() {
            continue;
        }
        if message == "help" {
            println!("{HELP}");
            continue;
        }

        writeln!(writer, "{message}").context("send command")?;

        let mut reply = String::new();
        if reader.read_line(&mut reply).context("read reply")? == 0 {
            println!("Server closed the connection");
            break;
        }
        let reply = reply.trim_end();

        if reply == DISCONNECT_SENTINEL {
            println!("{reply}");
            break;
        }
        println!("The server replied:\n{}\n", expand_reply(message, reply));
    }

    Ok(())
}
