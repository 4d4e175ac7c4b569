mod client;
mod wallet;

use std::env;

use anyhow::{Result, anyhow};
use log::debug;
use murk_account::{AccountId, LAMPORTS_PER_SOL};
use murk_keypair::SettlementMessage;
use murk_privacy::{Commitment, Denomination, PrivateNote};
use rand::rngs::OsRng;
use serde_json::{Value, json};

use client::{NodeClient, NodeError, node_error};
use wallet::{Wallet, parse_index, short};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];
    let rest = &args[2..];

    let result = match cmd.as_str() {
        "genkey" => genkey(rest.first().map(String::as_str)),
        "address" => address(rest),
        "deposit" => deposit(rest).await,
        "notes" => notes(),
        "withdraw" => withdraw(rest).await,
        "request" => request(rest).await,
        "claim" => claim(rest).await,
        "status" => status().await,
        "airdrop" => airdrop(rest).await,
        "churn-vault" => churn_vault(rest).await,
        "churn" => churn(rest, false).await,
        "unchurn" => churn(rest, true).await,
        "batch-claim" => batch_claim(rest).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Murk CLI - fixed-denomination privacy pool");
    println!();
    println!("USAGE:");
    println!("  murk <command> [args]");
    println!();
    println!("KEY COMMANDS:");
    println!("  genkey [filename]            Generate a new keypair (default: id.json)");
    println!("  address [stealth-index]      Show the identity or a stealth address");
    println!();
    println!("PRIVATE POOL:");
    println!("  deposit <sol>                Deposit 0.1, 0.5 or 1 SOL behind a new note");
    println!("  notes                        List stored notes");
    println!("  withdraw <commitment> <idx>  Withdraw a note to stealth address <idx> via the relayer");
    println!();
    println!("DELAYED QUEUE:");
    println!("  request <sol> <idx>          Request a delayed withdrawal to stealth address <idx>");
    println!("  claim <idx>                  Claim a ready withdrawal via the relayer");
    println!();
    println!("OPERATOR (signed with authority.json):");
    println!("  churn-vault <index>          Create churn vault <index> (0-2)");
    println!("  churn <index> <lamports>     Move funds from the pool vault into a churn vault");
    println!("  unchurn <index> <lamports>   Move funds from a churn vault back to the pool vault");
    println!("  batch-claim <recipient>...   Settle up to five ready withdrawals at once");
    println!();
    println!("OTHER COMMANDS:");
    println!("  status                       Pool and relayer status");
    println!("  airdrop <lamports>           Fund the identity (dev nodes only)");
    println!("  help                         Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  murk genkey");
    println!("  murk deposit 0.5");
    println!("  murk withdraw 9f3c…e1 0      # to stealth address 0");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  MURK_NODE_URL        Node API (default: {})", client::DEFAULT_NODE_URL);
    println!("  MURK_HOME            Keystore directory (default: ~/.murk)");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
    println!();
    println!("Losing a note loses its deposit. Back up the keystore directory.");
}

fn sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

fn sig58(sig: [u8; 64]) -> String {
    bs58::encode(sig).into_string()
}

fn arg<'a>(args: &'a [String], i: usize, usage: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Usage: murk {}", usage))
}

fn parse_denomination(s: &str) -> Result<Denomination> {
    Denomination::parse_sol(s).ok_or_else(|| {
        anyhow!(
            "{} SOL is not a pool denomination (use {})",
            s,
            Denomination::ALL.map(|d| d.to_string()).join(", ")
        )
    })
}

// ============================================================================
// Keys
// ============================================================================

fn genkey(filename: Option<&str>) -> Result<()> {
    let wallet = Wallet::from_env()?;
    println!("🔐 Generating new keypair...");
    let (path, key) = wallet.generate_key(filename)?;
    println!("✅ Wrote new keypair to {}", path.display());
    println!("🔑 Address: {}", key.account_id());
    Ok(())
}

fn address(args: &[String]) -> Result<()> {
    let wallet = Wallet::from_env()?;
    match args.first() {
        Some(i) => {
            let index = parse_index(i)?;
            println!("Stealth {}: {}", index, wallet.stealth(index)?.account_id());
        }
        None => println!("Identity: {}", wallet.identity()?.account_id()),
    }
    Ok(())
}

// ============================================================================
// Private pool
// ============================================================================

async fn deposit(args: &[String]) -> Result<()> {
    let denomination = parse_denomination(arg(args, 0, "deposit <sol>")?)?;
    deposit_note(&Wallet::from_env()?, &NodeClient::from_env(), denomination).await
}

async fn deposit_note(
    wallet: &Wallet,
    node: &NodeClient,
    denomination: Denomination,
) -> Result<()> {
    let id = wallet.identity()?;
    let mut store = wallet.notes()?;

    let created_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    let note = PrivateNote::generate(denomination, created_at, &mut OsRng);
    let commitment = note.commitment;

    // The note must be on disk before funds leave, or the deposit is lost.
    store.insert(note)?;
    debug!("Note {:?} stored in {}", commitment, wallet.dir().display());

    let sig = id.sign_message(&SettlementMessage::Deposit {
        commitment: commitment.record_id(),
        amount: denomination.lamports(),
    });
    println!("💸 Depositing {} ...", denomination);
    let result = node
        .deposit(
            &id.account_id().to_bs58(),
            &commitment.to_hex(),
            denomination.lamports(),
            &sig58(sig),
        )
        .await;

    match result {
        Ok(receipt) => {
            println!("✅ Deposited {} (seq {})", denomination, receipt.sequence);
            println!("📝 Commitment: {}", commitment.to_hex());
            println!("   Settlement: {}", receipt.settlement_ref);
            Ok(())
        }
        Err(e) if node_error(&e).is_some_and(NodeError::is_rejection) => {
            store.remove(&commitment)?;
            Err(e.context("deposit rejected, note discarded"))
        }
        Err(e) => {
            // The node may have settled before the reply was lost.
            if let Ok(Some(_)) = node.commitment(&commitment.to_hex()).await {
                println!("✅ Deposited {} (reply lost, found on the node)", denomination);
                println!("📝 Commitment: {}", commitment.to_hex());
                return Ok(());
            }
            Err(e.context(format!(
                "deposit outcome unknown, note kept; check GET /commitment/{}",
                commitment.to_hex()
            )))
        }
    }
}

fn notes() -> Result<()> {
    let wallet = Wallet::from_env()?;
    let store = wallet.notes()?;
    if store.is_empty() {
        println!("No notes stored.");
        return Ok(());
    }
    for note in store.iter() {
        println!(
            "{}  {:>5} SOL  {}",
            note.commitment.to_hex(),
            sol(note.amount),
            if note.spent { "spent" } else { "unspent" }
        );
    }
    println!();
    println!(
        "{} notes, {} SOL unspent",
        store.len(),
        sol(store.unspent_balance())
    );
    Ok(())
}

async fn withdraw(args: &[String]) -> Result<()> {
    const USAGE: &str = "withdraw <commitment> <stealth-index>";
    let commitment = Commitment::parse(arg(args, 0, USAGE)?)
        .ok_or_else(|| anyhow!("invalid commitment"))?;
    let index = parse_index(arg(args, 1, USAGE)?)?;
    withdraw_note(&Wallet::from_env()?, &NodeClient::from_env(), &commitment, index).await
}

async fn withdraw_note(
    wallet: &Wallet,
    node: &NodeClient,
    commitment: &Commitment,
    index: u32,
) -> Result<()> {
    let mut store = wallet.notes()?;
    let note = store
        .get(commitment)
        .cloned()
        .ok_or_else(|| anyhow!("no stored note for commitment {}", commitment))?;
    if note.spent {
        return Err(anyhow!("note already spent"));
    }

    let recipient = wallet.stealth(index)?;
    let inputs = note.withdrawal_inputs();
    let sig = recipient.sign_message(&SettlementMessage::Claim {
        record: commitment.record_id(),
    });
    let body = json!({
        "commitment": commitment.to_hex(),
        "nullifier": inputs.nullifier.to_hex(),
        "secretHash": inputs.secret_hash.to_hex(),
        "amount": inputs.amount,
        "recipient": recipient.account_id().to_bs58(),
        "signature": sig58(sig),
    });

    let receipt = match node.private_claim(&body).await {
        Ok(receipt) => receipt,
        Err(e) => {
            // A lost reply or an earlier attempt may already have spent it.
            let spent = node
                .nullifier(&inputs.nullifier.to_hex())
                .await
                .is_ok_and(|n| n.used);
            if spent {
                store.mark_spent(commitment)?;
                return Err(e.context("nullifier already used on the node, note marked spent"));
            }
            return Err(e);
        }
    };
    store.mark_spent(commitment)?;
    println!(
        "✅ Withdrew {} SOL to stealth {} ({})",
        sol(note.amount),
        index,
        short(&recipient.account_id())
    );
    println!(
        "   Settlement: {} via relayer {}",
        receipt.settlement_ref,
        receipt.relayer_id.unwrap_or_default()
    );
    Ok(())
}

// ============================================================================
// Delayed queue
// ============================================================================

async fn request(args: &[String]) -> Result<()> {
    const USAGE: &str = "request <sol> <stealth-index>";
    let denomination = parse_denomination(arg(args, 0, USAGE)?)?;
    let index = parse_index(arg(args, 1, USAGE)?)?;
    let wallet = Wallet::from_env()?;
    let recipient = wallet.stealth(index)?;

    let record = recipient.account_id().pending_record();
    let sig = recipient.sign_message(&SettlementMessage::Request {
        record,
        amount: denomination.lamports(),
    });
    let node = NodeClient::from_env();
    node.request(
        &recipient.account_id().to_bs58(),
        denomination.lamports(),
        &sig58(sig),
    )
    .await?;

    let pending = node.pending(&recipient.account_id().to_bs58()).await?;
    println!("⏳ Requested {} to stealth {}", denomination, index);
    println!("   Record: {}", pending.record);
    println!("   Claimable at unix time {}", pending.available_at);
    Ok(())
}

async fn claim(args: &[String]) -> Result<()> {
    let index = parse_index(arg(args, 0, "claim <stealth-index>")?)?;
    let wallet = Wallet::from_env()?;
    let recipient = wallet.stealth(index)?;
    let node = NodeClient::from_env();

    let pending = node.pending(&recipient.account_id().to_bs58()).await?;
    if pending.claimed {
        return Err(anyhow!("withdrawal already claimed"));
    }
    if !pending.ready {
        return Err(anyhow!(
            "withdrawal not ready until unix time {}",
            pending.available_at
        ));
    }
    let record: AccountId = pending
        .record
        .parse()
        .map_err(|e| anyhow!("node returned a bad record id: {}", e))?;
    let sig = recipient.sign_message(&SettlementMessage::Claim { record });
    let receipt = node
        .claim(&pending.record, &recipient.account_id().to_bs58(), &sig58(sig))
        .await?;
    println!(
        "✅ Claimed {} SOL to stealth {} (seq {})",
        sol(pending.amount),
        index,
        receipt.sequence
    );
    Ok(())
}

// ============================================================================
// Operator
// ============================================================================

/// Signs `message` at the current pool sequence and posts it to `/operator/<op>`.
async fn operator_call(
    op: &str,
    message: impl FnOnce(u64) -> SettlementMessage,
    mut body: Value,
) -> Result<()> {
    let authority = Wallet::from_env()?.authority()?;
    let node = NodeClient::from_env();
    let sequence = node.pool_stats().await?.sequence;
    body["signature"] = json!(sig58(authority.sign_message(&message(sequence))));
    let receipt = node.operator(op, &body).await?;
    println!("✅ {} settled (seq {})", op, receipt.sequence);
    Ok(())
}

fn parse_vault(s: &str) -> Result<u8> {
    s.parse()
        .map_err(|_| anyhow!("churn vault index must be 0, 1 or 2, got {:?}", s))
}

async fn churn_vault(args: &[String]) -> Result<()> {
    let index = parse_vault(arg(args, 0, "churn-vault <index>")?)?;
    operator_call(
        "churn-vault",
        |sequence| SettlementMessage::InitChurnVault { index, sequence },
        json!({ "index": index }),
    )
    .await
}

async fn churn(args: &[String], back: bool) -> Result<()> {
    let usage = if back {
        "unchurn <index> <lamports>"
    } else {
        "churn <index> <lamports>"
    };
    let index = parse_vault(arg(args, 0, usage)?)?;
    let amount: u64 = arg(args, 1, usage)?
        .parse()
        .map_err(|_| anyhow!("Amount must be a valid number"))?;
    let body = json!({ "index": index, "amount": amount });
    if back {
        operator_call(
            "unchurn",
            |sequence| SettlementMessage::Unchurn { index, amount, sequence },
            body,
        )
        .await
    } else {
        operator_call(
            "churn",
            |sequence| SettlementMessage::Churn { index, amount, sequence },
            body,
        )
        .await
    }
}

async fn batch_claim(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err(anyhow!("Usage: murk batch-claim <recipient>..."));
    }
    let mut accounts = Vec::with_capacity(args.len() * 2);
    for a in args {
        let recipient: AccountId = a
            .parse()
            .map_err(|e| anyhow!("invalid recipient {}: {}", a, e))?;
        accounts.push(recipient.pending_record());
        accounts.push(recipient);
    }
    let body = json!({
        "accounts": accounts.iter().map(AccountId::to_bs58).collect::<Vec<_>>(),
    });
    operator_call(
        "batch-claim",
        |sequence| SettlementMessage::BatchClaim { accounts, sequence },
        body,
    )
    .await
}

// ============================================================================
// Other
// ============================================================================

async fn status() -> Result<()> {
    let node = NodeClient::from_env();
    let stats = node.pool_stats().await?;
    println!("Node: {}", node.base_url());
    println!("Pool (seq {})", stats.sequence);
    println!("  vault        : {} SOL", sol(stats.vault_balance));
    println!(
        "  churn vaults : {}",
        stats
            .churn_balances
            .iter()
            .map(|b| format!("{} SOL", sol(*b)))
            .collect::<Vec<_>>()
            .join(" / ")
    );
    println!(
        "  deposits     : {} ({} SOL)",
        stats.deposit_count,
        sol(stats.total_deposited)
    );
    println!(
        "  withdrawals  : {} ({} SOL)",
        stats.withdraw_count,
        sol(stats.total_withdrawn)
    );
    println!("  churns       : {}", stats.churn_count);
    println!(
        "  amounts      : {}",
        stats
            .allowed_amounts
            .iter()
            .map(|a| format!("{}", sol(*a)))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let relayer = node.relayer_status().await?;
    if relayer.configured {
        println!(
            "Relayer {} : {} SOL, fee {} lamports",
            relayer.relayer_address.unwrap_or_default(),
            sol(relayer.balance),
            relayer.settlement_fee
        );
    } else {
        println!("Relayer      : not configured");
    }
    Ok(())
}

async fn airdrop(args: &[String]) -> Result<()> {
    let amount: u64 = arg(args, 0, "airdrop <lamports>")?
        .parse()
        .map_err(|_| anyhow!("Amount must be a valid number"))?;
    let wallet = Wallet::from_env()?;
    let id = wallet.identity()?;
    let node = NodeClient::from_env();
    let balance = node.airdrop(&id.account_id().to_bs58(), amount).await?;
    println!("✅ Balance of {}: {} SOL", id.account_id(), sol(balance.balance));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use murk_privacy::NoteStore;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// How the fake node answers one request line.
    type Reply = fn(&str) -> Option<(u16, String)>;

    /// Serves every connection with `reply`. `None` hangs up without answering.
    async fn fake_node(reply: Reply) -> NodeClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let line = read_request(&mut stream).await;
                if let Some((status, body)) = reply(&line) {
                    let response = format!(
                        "HTTP/1.1 {} X\r\n\
                         content-type: application/json\r\n\
                         content-length: {}\r\n\
                         connection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                }
            }
        });
        NodeClient::new(format!("http://{}", addr))
    }

    /// Reads one whole request and returns its request line.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        let text = String::from_utf8_lossy(&buf);
        text.lines().next().unwrap_or_default().to_string()
    }

    fn wallet() -> (TempDir, Wallet) {
        let dir = TempDir::new().unwrap();
        let wallet = Wallet::new(dir.path());
        wallet.generate_key(None).unwrap();
        (dir, wallet)
    }

    fn error_body(code: &str) -> String {
        json!({ "error": "rejected", "code": code, "retryable": false }).to_string()
    }

    #[tokio::test]
    async fn deposit_keeps_note_when_reply_is_lost() {
        let (_dir, wallet) = wallet();
        let node = fake_node(|_| None).await;

        let err = deposit_note(&wallet, &node, Denomination::HalfSol)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("note kept"), "{err:#}");
        let store = wallet.notes().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.unspent_balance(), Denomination::HalfSol.lamports());
    }

    #[tokio::test]
    async fn deposit_found_on_node_after_lost_reply() {
        let (_dir, wallet) = wallet();
        let node = fake_node(|line| {
            line.starts_with("GET /commitment/")
                .then(|| (200, json!({ "amount": 1, "spent": false }).to_string()))
        })
        .await;

        deposit_note(&wallet, &node, Denomination::TenthSol).await.unwrap();
        assert_eq!(wallet.notes().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deposit_discards_note_on_rejection() {
        let (_dir, wallet) = wallet();
        let node = fake_node(|_| Some((422, error_body("RESOURCE")))).await;

        let err = deposit_note(&wallet, &node, Denomination::OneSol)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("note discarded"));
        assert!(wallet.notes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deposit_keeps_note_on_server_error() {
        let (_dir, wallet) = wallet();
        let node = fake_node(|line| {
            if line.starts_with("GET /commitment/") {
                Some((404, error_body("NOT_FOUND")))
            } else {
                Some((500, error_body("STORAGE")))
            }
        })
        .await;

        assert!(deposit_note(&wallet, &node, Denomination::HalfSol).await.is_err());
        assert_eq!(wallet.notes().unwrap().len(), 1);
    }

    fn stored_note(wallet: &Wallet) -> Commitment {
        let note = PrivateNote::generate(Denomination::TenthSol, 0, &mut OsRng);
        let commitment = note.commitment;
        wallet.notes().unwrap().insert(note).unwrap();
        commitment
    }

    fn spent(wallet: &Wallet, commitment: &Commitment) -> bool {
        let store: NoteStore = wallet.notes().unwrap();
        store.get(commitment).unwrap().spent
    }

    #[tokio::test]
    async fn withdraw_conflict_marks_spent_note() {
        let (_dir, wallet) = wallet();
        let commitment = stored_note(&wallet);
        let node = fake_node(|line| {
            if line.starts_with("GET /nullifier/") {
                Some((200, json!({ "nullifier": "n", "used": true }).to_string()))
            } else {
                Some((409, error_body("STATE_CONFLICT")))
            }
        })
        .await;

        let err = withdraw_note(&wallet, &node, &commitment, 0).await.unwrap_err();
        assert!(format!("{:#}", err).contains("marked spent"));
        assert!(spent(&wallet, &commitment));
        assert!(withdraw_note(&wallet, &node, &commitment, 0).await.is_err());
    }

    #[tokio::test]
    async fn withdraw_rejection_leaves_note_unspent() {
        let (_dir, wallet) = wallet();
        let commitment = stored_note(&wallet);
        let node = fake_node(|line| {
            if line.starts_with("GET /nullifier/") {
                Some((200, json!({ "nullifier": "n", "used": false }).to_string()))
            } else {
                Some((403, error_body("AUTHORIZATION")))
            }
        })
        .await;

        assert!(withdraw_note(&wallet, &node, &commitment, 0).await.is_err());
        assert!(!spent(&wallet, &commitment));
    }
}
