//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - quantum cheater detection on a local QVM",
        style("qcoin").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qcoin-ir           Quil-style program representation");
    println!("  qcoin-hal          Backend abstraction layer");
    println!("  qcoin-adapter-qvm  Statevector QVM with classical control");
    println!("  qcoin-games        Coin games, parallel runs, control scenarios");
    println!("  qcoin-cli          Command-line interface");
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
