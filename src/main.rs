use clap::{Args, Parser, Subcommand};
use log::{error, info};
use referral_client::api::endpoints::{
    BadgeType, BankDetails, InviteRequest, PageRequest, PayoutRequest, RegisterRequest, Role,
    UpdateUserRequest, UserDetails,
};
use referral_client::app::App;
use referral_client::auth::{is_session_lost, LoginOutcome};
use referral_client::config::{AppPaths, Config, TokenStorage};
use referral_client::error::{ClientError, Result};
use referral_client::{logging, validation};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "referral-cli")]
#[command(about = "Command-line client for the referral and payout service")]
#[command(version)]
struct Cli {
    /// Keep settings, session and logs under this directory
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Finish a login with the one-time code sent by email
    VerifyOtp {
        #[arg(long)]
        email: String,

        #[arg(long)]
        otp: String,
    },

    /// Create an account from an invitation PIN
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        pin: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        confirm_password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show endpoint and session state
    Status,

    /// Show the logged-in user's profile
    Profile,

    /// Invite people by email (comma or space separated)
    Invite {
        #[arg(required = true)]
        emails: Vec<String>,

        /// green or yellow
        #[arg(long)]
        badge: Option<BadgeType>,
    },

    /// Print your referral tree
    Tree,

    /// Total commission earned
    Earnings {
        /// Another user's id (administrators only)
        #[arg(long)]
        user: Option<String>,
    },

    /// Current wallet balance
    Balance {
        /// Another user's id (administrators only)
        #[arg(long)]
        user: Option<String>,
    },

    /// List wallet transactions
    Transactions {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
    },

    /// List commissions earned from referrals
    Commissions {
        #[arg(long, default_value_t = 0)]
        page: u32,
    },

    /// Show your personal and bank details
    Details,

    /// Update your personal and bank details
    UpdateDetails {
        #[command(flatten)]
        fields: DetailsArgs,
    },

    /// List users (administrators only)
    Users {
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long)]
        search: Option<String>,
    },

    /// Show one user with balance and earnings (administrators only)
    User { id: String },

    /// Update a user's details (administrators only)
    UpdateUser {
        id: String,

        #[command(flatten)]
        fields: DetailsArgs,
    },

    /// Pay out part of a user's balance (administrators only)
    Payout { user_id: String, amount: f64 },

    /// Show or change client settings
    Config {
        #[arg(long)]
        api_endpoint: Option<String>,

        /// keyring or file
        #[arg(long)]
        token_storage: Option<TokenStorage>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        #[arg(long)]
        page_size: Option<u32>,

        /// Show current configuration
        #[arg(long, short)]
        show: bool,
    },
}

/// Editable fields of a user record; unset flags keep the current value.
#[derive(Args, Default)]
struct DetailsArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    account_holder_name: Option<String>,

    #[arg(long)]
    bank_name: Option<String>,

    #[arg(long)]
    account_number: Option<String>,

    #[arg(long)]
    ifsc_code: Option<String>,

    #[arg(long)]
    branch: Option<String>,

    #[arg(long)]
    upi_id: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = match &cli.home {
        Some(home) => AppPaths::in_dir(home)?,
        None => AppPaths::new()?,
    };

    logging::init_logging(&paths.log_file)?;

    let config = Config::with_paths(paths)?;

    // Settings edits must work even when the stored settings are invalid
    let command = match cli.command {
        Commands::Config {
            api_endpoint,
            token_storage,
            timeout,
            page_size,
            show,
        } => return configure(&config, api_endpoint, token_storage, timeout, page_size, show),
        command => command,
    };

    let app = App::new(config)?;

    match command {
        Commands::Login { email, password } => login(&app, &email, password).await,
        Commands::VerifyOtp { email, otp } => verify_otp(&app, &email, &otp).await,
        Commands::Register {
            name,
            email,
            pin,
            password,
            confirm_password,
        } => {
            register(
                &app,
                RegisterRequest {
                    name,
                    email,
                    pin,
                    password,
                    confirm_password,
                },
            )
            .await
        }
        Commands::Logout => logout(&app),
        Commands::Status => show_status(&app),
        Commands::Profile => show_profile(&app).await,
        Commands::Invite { emails, badge } => invite(&app, &emails, badge).await,
        Commands::Tree => show_tree(&app).await,
        Commands::Earnings { user } => show_earnings(&app, user).await,
        Commands::Balance { user } => show_balance(&app, user).await,
        Commands::Transactions { page } => list_transactions(&app, page).await,
        Commands::Commissions { page } => list_commissions(&app, page).await,
        Commands::Details => show_details(&app).await,
        Commands::UpdateDetails { fields } => update_details(&app, fields).await,
        Commands::Users { page, search } => list_users(&app, page, search).await,
        Commands::User { id } => show_user(&app, &id).await,
        Commands::UpdateUser { id, fields } => update_user(&app, &id, fields).await,
        Commands::Payout { user_id, amount } => payout(&app, &user_id, amount).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn report(e: &ClientError) {
    error!("{e}");

    match e {
        ClientError::Api(api_error) => eprintln!("Error: {}", api_error.user_message()),
        ClientError::Validation(errors) => {
            for violation in &errors.violations {
                eprintln!("  {}: {}", violation.field, violation.message);
            }
        }
        other => eprintln!("Error: {other}"),
    }

    if is_session_lost(e) {
        eprintln!("Session expired, please login again.");
    }
}

async fn login(app: &App, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    match app.auth().login(email, &password).await? {
        LoginOutcome::Authenticated => {
            println!("Successfully authenticated!");
            print_identity(app);
        }
        LoginOutcome::OtpRequired => {
            println!("A one-time code was sent to {email}.");
            println!("Run 'referral-cli verify-otp --email {email} --otp <code>' to finish.");
        }
    }

    Ok(())
}

async fn verify_otp(app: &App, email: &str, otp: &str) -> Result<()> {
    app.auth().verify_otp(email, otp).await?;
    println!("Successfully authenticated!");
    print_identity(app);
    Ok(())
}

async fn register(app: &App, request: RegisterRequest) -> Result<()> {
    let message = app.auth().register(&request).await?;
    println!(
        "{}",
        message.unwrap_or_else(|| "Registration complete".to_string())
    );
    println!("Run 'referral-cli login --email {}' to continue.", request.email);
    Ok(())
}

fn logout(app: &App) -> Result<()> {
    app.auth().logout()?;
    println!("Logged out successfully");
    Ok(())
}

fn show_status(app: &App) -> Result<()> {
    let settings = app.config().settings();

    println!("API endpoint: {}", app.api().base_url());
    println!("Token storage: {:?}", settings.token_storage);

    if !app.auth().is_authenticated() {
        println!("\nNot authenticated. Run 'referral-cli login' to authenticate.");
        return Ok(());
    }

    print_identity(app);
    Ok(())
}

fn print_identity(app: &App) {
    match app.auth().access_claims() {
        Some(Ok(token)) => {
            let who = token
                .claims
                .email
                .clone()
                .or_else(|| token.claims.user_id().map(str::to_string))
                .unwrap_or_else(|| "unknown user".to_string());
            println!("Logged in as: {who}");
            if let Some(role) = token.claims.role {
                println!("Role: {role}");
            }
            if let Some(expires_at) = token.expires_at() {
                let state = if token.is_expired() {
                    " (expired, renewed on next request)"
                } else {
                    ""
                };
                println!("Access token expires: {expires_at}{state}");
            }
        }
        Some(Err(e)) => {
            info!("Stored access token is not a readable JWT: {e}");
            println!("Logged in");
        }
        None => println!("Not authenticated"),
    }
}

async fn show_profile(app: &App) -> Result<()> {
    app.auth().require_session()?;
    let profile = app.api().profile().await?;

    println!("Id: {}", profile.id);
    println!("Email: {}", profile.email);
    if let Some(user_name) = &profile.user_name {
        println!("Username: {user_name}");
    }
    let full_name = [profile.first_name.as_deref(), profile.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        println!("Name: {full_name}");
    }
    if let Some(phone) = &profile.phone {
        println!("Phone: {phone}");
    }
    println!("Role: {}", profile.role);
    Ok(())
}

async fn invite(app: &App, inputs: &[String], badge: Option<BadgeType>) -> Result<()> {
    app.auth().require_session()?;

    let request = InviteRequest {
        emails: validation::parse_invite_emails(&inputs.join(" "), &[]),
        badge_type: badge,
    };
    validation::invite(&request)?;

    app.api().invite_users(&request).await?;

    println!("Invitation sent to {} address(es):", request.emails.len());
    for email in &request.emails {
        println!("  {email}");
    }
    Ok(())
}

async fn show_tree(app: &App) -> Result<()> {
    app.auth().require_session()?;
    let root = app.api().referral_tree().await?;

    println!("{}", serde_json::to_string_pretty(&root)?);
    println!("\n{} referral(s) in total", root.descendant_count());
    Ok(())
}

/// Viewing another user's figures needs an administrator account.
async fn authorize_target(app: &App, user: Option<&str>) -> Result<()> {
    match user {
        Some(_) => app.auth().require_role(Role::Admin).await.map(|_| ()),
        None => app.auth().require_session(),
    }
}

async fn show_earnings(app: &App, user: Option<String>) -> Result<()> {
    authorize_target(app, user.as_deref()).await?;
    let total = app.api().total_commission(user.as_deref()).await?;
    println!("Total earnings: {total:.2}");
    Ok(())
}

async fn show_balance(app: &App, user: Option<String>) -> Result<()> {
    authorize_target(app, user.as_deref()).await?;
    let balance = app.api().balance(user.as_deref()).await?;
    println!("Balance: {balance:.2}");
    Ok(())
}

async fn list_transactions(app: &App, page: u32) -> Result<()> {
    app.auth().require_session()?;
    let request = PageRequest::from_page(page, app.page_size());
    let transactions = app.api().transactions(request).await?;

    for t in &transactions.list {
        println!(
            "{:<10} {:>10.2} balance {:>10.2} {:<9} {}",
            format!("{:?}", t.kind),
            t.last_amount_added,
            t.balance,
            t.status.map(|s| format!("{s:?}")).unwrap_or_default(),
            t.created_at.as_deref().unwrap_or("")
        );
    }
    print_page_footer(page, request, transactions.list.len(), transactions.total);
    Ok(())
}

async fn list_commissions(app: &App, page: u32) -> Result<()> {
    app.auth().require_session()?;
    let request = PageRequest::from_page(page, app.page_size());
    let commissions = app.api().commissions(request).await?;

    for c in &commissions.list {
        println!(
            "level {:<2} {:>10.2} from {} {}",
            c.level,
            c.amount,
            c.referred_user_id.email,
            if c.is_paid == Some(true) { "(paid)" } else { "" }
        );
    }
    print_page_footer(page, request, commissions.list.len(), commissions.total);
    Ok(())
}

fn print_page_footer(page: u32, request: PageRequest, shown: usize, total: u64) {
    println!(
        "\nPage {} - showing {} of {} (from #{})",
        page,
        shown,
        total,
        u64::from(request.skip) + 1
    );
}

async fn show_details(app: &App) -> Result<()> {
    app.auth().require_session()?;
    let details = app.api().personal_details().await?;
    print_details(&details);
    Ok(())
}

fn print_details(details: &UserDetails) {
    let user = &details.user;
    println!("Id: {}", user.id);
    println!("Name: {}", user.name.as_deref().unwrap_or(""));
    println!("Email: {}", user.email);
    println!("Role: {}", user.role);
    if let Some(badge) = user.badge_type {
        println!("Badge: {badge:?}");
    }
    if user.blocked == Some(true) {
        println!(
            "Blocked: {}",
            user.block_reason.as_deref().unwrap_or("no reason given")
        );
    }
    if let Some(count) = user.direct_referral_count {
        println!("Direct referrals: {count}");
    }

    match &details.bank_details {
        Some(bank) => {
            println!("\nBank details:");
            println!("  Account holder: {}", bank.account_holder_name);
            println!("  Bank: {}", bank.bank_name);
            println!("  Account number: {}", bank.account_number);
            println!("  IFSC code: {}", bank.ifsc_code);
            if let Some(branch) = &bank.branch {
                println!("  Branch: {branch}");
            }
            if let Some(upi_id) = &bank.upi_id {
                println!("  UPI id: {upi_id}");
            }
        }
        None => println!("\nNo bank details on file"),
    }
}

/// Overlays the given flags on the stored record and validates the result.
fn merge_details(id: &str, current: &UserDetails, fields: DetailsArgs) -> Result<UpdateUserRequest> {
    let name = fields
        .name
        .or_else(|| current.user.name.clone())
        .unwrap_or_default();
    let email = fields.email.unwrap_or_else(|| current.user.email.clone());

    let mut bank = current.bank_details.clone().unwrap_or_default();
    if let Some(v) = fields.account_holder_name {
        bank.account_holder_name = v;
    }
    if let Some(v) = fields.bank_name {
        bank.bank_name = v;
    }
    if let Some(v) = fields.account_number {
        bank.account_number = v;
    }
    if let Some(v) = fields.ifsc_code {
        bank.ifsc_code = v;
    }
    if fields.branch.is_some() {
        bank.branch = fields.branch;
    }
    if fields.upi_id.is_some() {
        bank.upi_id = fields.upi_id;
    }

    let request = UpdateUserRequest {
        id: id.to_string(),
        name: Some(name.trim().to_string()),
        email: Some(email.trim().to_string()),
        bank_details: Some(BankDetails {
            user_id: Some(id.to_string()),
            account_holder_name: bank.account_holder_name.trim().to_string(),
            bank_name: bank.bank_name.trim().to_string(),
            account_number: bank.account_number.trim().to_string(),
            ifsc_code: bank.ifsc_code.trim().to_string(),
            ..bank
        }),
    };
    validation::check(&request)?;

    Ok(request)
}

async fn update_details(app: &App, fields: DetailsArgs) -> Result<()> {
    app.auth().require_session()?;

    let profile = app.api().profile().await?;
    let current = app.api().personal_details().await?;
    let request = merge_details(&profile.id, &current, fields)?;

    app.api().update_user(&request).await?;
    println!("Details updated");
    Ok(())
}

async fn list_users(app: &App, page: u32, search: Option<String>) -> Result<()> {
    app.auth().require_role(Role::Admin).await?;

    let request = PageRequest::from_page(page, app.page_size());
    let users = app.api().users(request, search.as_deref()).await?;

    for u in &users.list {
        let state = if u.blocked == Some(true) {
            "blocked"
        } else if u.active == Some(false) {
            "inactive"
        } else {
            "active"
        };
        println!(
            "{}  {:<24} {:<32} {:<5} {:<8} {:>10.2}",
            u.id,
            u.name.as_deref().unwrap_or(""),
            u.email,
            u.role,
            state,
            u.total_earnings.unwrap_or_default()
        );
    }
    print_page_footer(page, request, users.list.len(), users.total);
    Ok(())
}

async fn show_user(app: &App, id: &str) -> Result<()> {
    app.auth().require_role(Role::Admin).await?;

    let details = app.api().user_details(id).await?;
    let balance = app.api().balance(Some(id)).await?;
    let earnings = app.api().total_commission(Some(id)).await?;

    print_details(&details);
    println!("\nBalance: {balance:.2}");
    println!("Total earnings: {earnings:.2}");
    if let Some(eligible) = details.user.is_payout_eligible {
        println!("Payout eligible: {eligible}");
    }
    Ok(())
}

async fn update_user(app: &App, id: &str, fields: DetailsArgs) -> Result<()> {
    app.auth().require_role(Role::Admin).await?;

    let current = app.api().user_details(id).await?;
    let request = merge_details(id, &current, fields)?;

    app.api().update_user(&request).await?;
    println!("User {id} updated");
    Ok(())
}

async fn payout(app: &App, user_id: &str, amount: f64) -> Result<()> {
    app.auth().require_role(Role::Admin).await?;

    let balance = app.api().balance(Some(user_id)).await?;
    let request = PayoutRequest {
        amount,
        user_id: user_id.to_string(),
    };
    validation::payout(&request, balance)?;

    app.api().payout(&request).await?;

    info!("Paid out {amount:.2} to {user_id}");
    println!("Paid out {amount:.2}. Remaining balance: {:.2}", balance - amount);
    Ok(())
}

fn configure(
    config: &Config,
    api_endpoint: Option<String>,
    token_storage: Option<TokenStorage>,
    timeout: Option<u64>,
    page_size: Option<u32>,
    show: bool,
) -> Result<()> {
    if show {
        let settings = config.settings();
        println!("Current configuration:");
        println!("  API endpoint: {}", settings.api_endpoint());
        println!("  Token storage: {:?}", settings.token_storage);
        println!("  Request timeout: {} seconds", settings.request_timeout_secs);
        println!("  Page size: {}", settings.page_size);
        println!("  Settings file: {}", config.paths().settings_file.display());
        return Ok(());
    }

    let changed = api_endpoint.is_some()
        || token_storage.is_some()
        || timeout.is_some()
        || page_size.is_some();

    if !changed {
        println!("No changes made. Use --show to see current configuration.");
        return Ok(());
    }

    config.update_settings(|s| {
        if let Some(endpoint) = api_endpoint {
            s.api_endpoint = Some(endpoint);
        }
        if let Some(storage) = token_storage {
            s.token_storage = storage;
        }
        if let Some(secs) = timeout {
            s.request_timeout_secs = secs;
        }
        if let Some(size) = page_size {
            s.page_size = size;
        }
    })?;

    println!("Configuration saved");
    if token_storage.is_some() {
        println!("Log in again for the new token storage to take effect.");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_details() -> UserDetails {
        serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Asha",
            "email": "asha@example.com",
            "role": "USER",
            "bankDetails": {
                "accountHolderName": "Asha K",
                "bankName": "State Bank",
                "accountNumber": "0012345",
                "ifscCode": "SBIN0001"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_details_keeps_unset_fields() {
        let fields = DetailsArgs {
            bank_name: Some("City Bank".to_string()),
            ..Default::default()
        };

        let request = merge_details("u1", &stored_details(), fields).unwrap();

        assert_eq!(request.name.as_deref(), Some("Asha"));
        assert_eq!(request.email.as_deref(), Some("asha@example.com"));
        let bank = request.bank_details.unwrap();
        assert_eq!(bank.bank_name, "City Bank");
        assert_eq!(bank.account_number, "0012345");
        assert_eq!(bank.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_merge_details_rejects_missing_bank_fields() {
        let current: UserDetails = serde_json::from_value(serde_json::json!({
            "_id": "u2",
            "name": "Ravi",
            "email": "ravi@example.com"
        }))
        .unwrap();

        let fields = DetailsArgs {
            bank_name: Some("City Bank".to_string()),
            ..Default::default()
        };

        let err = merge_details("u2", &current, fields).unwrap_err();
        let ClientError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.message_for("account_number"),
            Some("Account Number is required")
        );
        assert_eq!(errors.message_for("bank_name"), None);
    }
}
