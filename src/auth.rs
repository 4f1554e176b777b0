//! Interactive Google sign-in

use anyhow::{Context, Result};
use console::Style;
use dialoguer::Input;
use reqwest::Client as HttpClient;

use sheetai_core::config::SheetsSettings;
use sheetai_core::sheets::{Credentials, InstalledApp, TokenSource};

/// A usable token source, walking the user through consent when needed
pub async fn ensure_token_source(settings: &SheetsSettings, http: &HttpClient) -> Result<TokenSource> {
    match Credentials::resolve(settings, http).context("Failed to load Google credentials")? {
        Credentials::Ready(tokens) => Ok(tokens),
        Credentials::NeedsAuthorization(app) => authorize(&app, settings, http).await,
    }
}

async fn authorize(app: &InstalledApp, settings: &SheetsSettings, http: &HttpClient) -> Result<TokenSource> {
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("Please go to this URL and authorize the application:"));
    println!("{}", app.authorization_url());

    let pasted: String = Input::<String>::new()
        .with_prompt("Enter the authorization code")
        .interact_text()
        .context("No authorization code entered")?;

    let user = app
        .exchange_code(http, &pasted)
        .await
        .context("Failed to exchange the authorization code")?;
    user.save(&settings.token_path)
        .with_context(|| format!("Failed to save {}", settings.token_path.display()))?;

    let green = Style::new().green();
    println!(
        "{} {}",
        green.apply_to("Credentials saved to"),
        settings.token_path.display()
    );
    Ok(TokenSource::authorized(user, &settings.token_path, http.clone()))
}
