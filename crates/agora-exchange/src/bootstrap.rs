//! Session setup: product list loading and trader process launch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use agora_core::{ProductRegistry, TraderId};
use agora_net::Gateway;
use mio::unix::pipe::{Receiver, Sender};
use tracing::{info, warn};

use crate::error::{ExchangeError, Result};
use crate::registry::TraderRegistry;

/// Longest product name.
pub const PRODUCT_NAME_MAX: usize = 16;

fn product_error(line: usize, reason: impl Into<String>) -> ExchangeError {
    ExchangeError::ProductFile {
        line,
        reason: reason.into(),
    }
}

fn is_valid_product_name(name: &str) -> bool {
    (1..=PRODUCT_NAME_MAX).contains(&name.len()) && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Parse a product file: a count line followed by one name per line.
///
/// Blank lines are skipped. Lines past the declared count are ignored.
pub fn parse_products(contents: &str) -> Result<ProductRegistry> {
    let mut lines = contents
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (count_line, count) = lines
        .next()
        .ok_or_else(|| product_error(1, "missing product count"))?;
    let count: usize = count
        .parse()
        .map_err(|_| product_error(count_line, format!("invalid product count '{}'", count)))?;
    if count == 0 {
        return Err(product_error(count_line, "product count must be positive"));
    }

    let mut names = Vec::with_capacity(count);
    let mut last_line = count_line;
    for (line, name) in lines.by_ref().take(count) {
        if !is_valid_product_name(name) {
            return Err(product_error(
                line,
                format!(
                    "invalid product name '{}' (1-{} alphanumeric characters)",
                    name, PRODUCT_NAME_MAX
                ),
            ));
        }
        names.push(name.to_string());
        last_line = line;
    }

    if names.len() < count {
        return Err(product_error(
            last_line + 1,
            format!("expected {} products, found {}", count, names.len()),
        ));
    }

    let extra = lines.count();
    if extra > 0 {
        warn!(extra, "ignoring lines after the declared product count");
    }

    ProductRegistry::new(names).map_err(ExchangeError::DuplicateProduct)
}

/// Read and parse the product file at `path`.
pub fn load_products(path: &Path) -> Result<ProductRegistry> {
    let contents = fs::read_to_string(path)?;
    let products = parse_products(&contents)?;

    let names: Vec<&str> = products.iter().map(|(_, name)| name).collect();
    info!("Trading {} products: {}", products.product_count(), names.join(" "));
    Ok(products)
}

/// A launched trader process.
pub struct TraderProcess {
    pub id: TraderId,
    pub path: PathBuf,
    pub child: Child,
}

/// Launch each trader as `<binary> <id>` and attach its pipes to `gateway`.
///
/// The trader's stdout carries its messages to the exchange; its stdin
/// carries the exchange's replies.
pub fn spawn_traders(
    binaries: &[PathBuf],
    gateway: &mut Gateway,
    registry: &mut TraderRegistry,
) -> Result<Vec<TraderProcess>> {
    let mut processes = Vec::with_capacity(binaries.len());

    for (idx, path) in binaries.iter().enumerate() {
        let id = TraderId(idx as u32);

        let mut child = Command::new(path)
            .arg(idx.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ExchangeError::Spawn {
                path: path.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "trader stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "trader stdout not captured"))?;

        let sender = Sender::from(stdin);
        sender.set_nonblocking(true)?;
        let receiver = Receiver::from(stdout);
        receiver.set_nonblocking(true)?;

        let channel = gateway.attach(receiver, sender)?;
        registry.register(id, channel)?;
        info!("Starting trader {} ({}), pid {}", id, path.display(), child.id());

        processes.push(TraderProcess {
            id,
            path: path.clone(),
            child,
        });
    }

    Ok(processes)
}

/// Reap every trader process and log how it exited.
///
/// Returns the exit status of each process that could be waited on, in
/// launch order.
pub fn wait_for_traders(processes: Vec<TraderProcess>) -> Vec<(TraderId, ExitStatus)> {
    let mut statuses = Vec::with_capacity(processes.len());
    for mut process in processes {
        match process.child.wait() {
            Ok(status) => {
                info!(trader = %process.id, %status, "trader exited");
                statuses.push((process.id, status));
            }
            Err(e) => warn!(trader = %process.id, path = %process.path.display(), error = %e, "failed to wait for trader"),
        }
    }
    statuses
}
