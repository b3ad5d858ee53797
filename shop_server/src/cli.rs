use std::{env, env::VarError};

/// The server takes no real command line arguments. Passing any argument prints the help text and the
/// current non-secret configuration instead of starting the server.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Only names on this list are ever printed. Credential variables stay off it.
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "SHOP_HOST",
        "SHOP_PORT",
        "SHOP_DATABASE_URL",
        "SHOP_PUBLIC_BASE_URL",
        "SHOP_RETURN_URL",
        "SHOP_CURRENCY",
        "SHOP_STRIPE_API_URL",
        "SHOP_PAYPAL_API_URL",
        "SHOP_PAYPAL_SANDBOX",
        "SHOP_FONDY_API_URL",
        "SHOP_FONDY_MERCHANT_ID",
        "SHOP_PORTMONE_GATEWAY_URL",
        "SHOP_LIQPAY_SANDBOX",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
