mod cli;

use jellystream::client::{self, Credentials, ItemsQuery, JellyfinClient, MediaItem};
use jellystream::config::{self, Config};
use jellystream::headless::{HeadlessAutoplay, HttpProbeElement, ManifestEngineFactory};
use jellystream::SessionContext;
use jellystream_common::{
    DeviceId, ImageType, ItemId, PlaySessionId, PlaybackState, StreamingStrategy,
};
use jellystream_playback::{build_stream_url, spawn_player, PlayerEvent, StreamRequest};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "jellystream=trace,jellystream_playback=trace,jellystream_common=debug".to_string()
        } else {
            "jellystream=info,jellystream_playback=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Validate { config } = &cli.command {
        return validate_config(config.as_deref().or(cli.config.as_deref()));
    }

    // Command line flags override the config file
    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server.url = Some(server);
    }
    if let Some(username) = cli.username {
        config.server.username = Some(username);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command, config, cli.password))
}

async fn run(command: Commands, config: Config, password: Option<String>) -> Result<()> {
    let client = JellyfinClient::new(&config.client);
    let ctx = login(&client, &config, password).await?;

    let result = match command {
        Commands::Login => show_login(&client, &ctx).await,
        Commands::Libraries => list_libraries(&client, &ctx).await,
        Commands::Home => show_home(&client, &ctx).await,
        Commands::Items {
            parent,
            limit,
            sort_by,
            json,
        } => list_items(&client, &ctx, &parent, limit, sort_by, json).await,
        Commands::Show { id, json } => show_item(&client, &ctx, &id, json).await,
        Commands::ImageUrl { id, image_type } => print_image_url(&client, &ctx, &id, image_type).await,
        Commands::StreamUrl { id, strategy } => print_stream_url(&config, &ctx, &id, strategy),
        Commands::Play {
            id,
            autoplay,
            native_hls,
            manual_retries,
            timeout_secs,
        } => {
            play(
                &config,
                &ctx,
                &id,
                autoplay,
                native_hls,
                manual_retries,
                Duration::from_secs(timeout_secs),
            )
            .await
        }
        Commands::Validate { .. } => Ok(()),
    };

    ctx.logout();
    result
}

async fn login(
    client: &JellyfinClient,
    config: &Config,
    password: Option<String>,
) -> Result<SessionContext> {
    let server_url = config
        .server
        .url
        .clone()
        .context("No server configured; pass --server or set [server] url")?;
    let username = config
        .server
        .username
        .clone()
        .context("No user configured; pass --username or set [server] username")?;

    let credentials = Credentials {
        server_url,
        username,
        password: password.unwrap_or_default(),
    };
    client
        .authenticate(&credentials)
        .await
        .context("Login failed. Check your credentials and that the server is reachable")
}

async fn show_login(client: &JellyfinClient, ctx: &SessionContext) -> Result<()> {
    let info = client.check_server(ctx).await?;
    println!("Signed in as {} ({})", ctx.user().name, ctx.user_id());
    println!("Server: {}", ctx.server());
    if let Some(name) = info.server_name {
        println!("  Name: {}", name);
    }
    if let Some(version) = info.version {
        println!("  Version: {}", version);
    }
    Ok(())
}

async fn list_libraries(client: &JellyfinClient, ctx: &SessionContext) -> Result<()> {
    let libraries = client.get_libraries(ctx).await?;
    if libraries.is_empty() {
        println!("No libraries found. Check the user's permissions.");
        return Ok(());
    }
    for library in &libraries {
        match &library.collection_type {
            Some(kind) => println!("{}  {} ({})", library.id, library.name, kind),
            None => println!("{}  {}", library.id, library.name),
        }
    }
    Ok(())
}

async fn show_home(client: &JellyfinClient, ctx: &SessionContext) -> Result<()> {
    let home = client.home(ctx).await?;

    if let Some(featured) = &home.featured {
        println!("Featured: {}", describe(featured));
        if let Some(overview) = &featured.overview {
            println!("  {}", overview);
        }
        println!();
    }

    println!("Libraries: {}", home.libraries.len());
    for library in &home.libraries {
        println!("  {}  {}", library.id, library.name);
    }
    for (title, row) in [("Movies", &home.movies), ("TV Shows", &home.tv_shows)] {
        if row.is_empty() {
            continue;
        }
        println!("\n{} ({})", title, row.len());
        for item in row {
            println!("  {}  {}", item.id, describe(item));
        }
    }
    Ok(())
}

async fn list_items(
    client: &JellyfinClient,
    ctx: &SessionContext,
    parent: &str,
    limit: u32,
    sort_by: Option<String>,
    json: bool,
) -> Result<()> {
    let query = ItemsQuery {
        limit: Some(limit),
        sort_order: sort_by.as_ref().map(|_| "Descending".to_string()),
        sort_by,
        ..Default::default()
    };
    let page = client
        .get_items(ctx, Some(&ItemId::new(parent)), &query)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("{} of {} items", page.items.len(), page.total_record_count);
    for item in &page.items {
        println!("  {}  {}", item.id, describe(item));
    }
    Ok(())
}

async fn show_item(client: &JellyfinClient, ctx: &SessionContext, id: &str, json: bool) -> Result<()> {
    let item = client.get_item(ctx, &ItemId::new(id)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!("{}", describe(&item));
    println!("Type: {}", item.item_type);
    if let Some(rating) = item.community_rating {
        println!("Rating: {:.1}", rating);
    }
    if !item.genres.is_empty() {
        println!("Genres: {}", item.genres.join(", "));
    }
    if !item.studios.is_empty() {
        let studios: Vec<&str> = item.studios.iter().map(|s| s.name.as_str()).collect();
        println!("Studios: {}", studios.join(", "));
    }
    if let Some(overview) = &item.overview {
        println!("\n{}", overview);
    }
    println!(
        "\nPoster: {}",
        client::image_url(ctx, &item, ImageType::Primary).unwrap_or_else(|| "(placeholder)".into())
    );
    if let Some(backdrop) = client::backdrop_url(ctx, &item) {
        println!("Backdrop: {}", backdrop);
    }
    Ok(())
}

async fn print_image_url(
    client: &JellyfinClient,
    ctx: &SessionContext,
    id: &str,
    image_type: ImageType,
) -> Result<()> {
    let item = client.get_item(ctx, &ItemId::new(id)).await?;
    let url = match image_type {
        ImageType::Backdrop => client::backdrop_url(ctx, &item),
        other => client::image_url(ctx, &item, other),
    };
    println!("{}", url.unwrap_or_else(|| "(placeholder)".into()));
    Ok(())
}

fn print_stream_url(
    config: &Config,
    ctx: &SessionContext,
    id: &str,
    strategy: StreamingStrategy,
) -> Result<()> {
    let target = ctx.stream_target();
    let item_id = ItemId::new(id);
    let url = build_stream_url(&StreamRequest {
        target: &target,
        item_id: &item_id,
        strategy,
        play_session_id: &PlaySessionId::generate(),
        device_id: &DeviceId::random(),
        profile: &config.playback.transcode,
    })?;
    println!("{}", url);
    Ok(())
}

async fn play(
    config: &Config,
    ctx: &SessionContext,
    id: &str,
    autoplay: HeadlessAutoplay,
    native_hls: bool,
    mut manual_retries: u32,
    timeout: Duration,
) -> Result<()> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.client.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let element = HttpProbeElement::new(http.clone(), autoplay).with_native_hls(native_hls);
    let player = spawn_player(
        config.playback.clone(),
        ctx.stream_target(),
        Box::new(element),
        Box::new(ManifestEngineFactory::new(http)),
    );
    let mut events = player.subscribe();
    player.open(id).await?;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            _ = &mut deadline => {
                break Err(anyhow::anyhow!("Playback did not start within {}s", timeout.as_secs()));
            }
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event);
                    match event {
                        PlayerEvent::StateChanged { to: PlaybackState::Playing, .. } => break Ok(()),
                        PlayerEvent::Advisory { .. } => {
                            println!("  Pressing play");
                            player.toggle_play().await?;
                        }
                        PlayerEvent::Failed { recoverable: false, message } => {
                            break Err(anyhow::anyhow!(message));
                        }
                        PlayerEvent::RetryCeilingExceeded { message, .. } => {
                            if manual_retries == 0 {
                                break Err(anyhow::anyhow!(message));
                            }
                            manual_retries -= 1;
                            println!("  Retrying manually");
                            player.manual_retry().await?;
                        }
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} player events", skipped);
                }
                Err(RecvError::Closed) => break Err(anyhow::anyhow!("Player stopped unexpectedly")),
            }
        }
    };

    let snapshot = player.snapshot();
    println!(
        "\nState: {}  Strategy: {}  Muted: {}",
        snapshot.state, snapshot.strategy_label, snapshot.is_muted
    );
    player.close().await?;
    outcome
}

fn print_event(event: &PlayerEvent) {
    match event {
        PlayerEvent::StateChanged { from, to } => println!("[state] {} -> {}", from, to),
        PlayerEvent::SessionStarted {
            strategy,
            play_session_id,
            ..
        } => println!("[session] {} ({})", strategy.label(), play_session_id),
        PlayerEvent::StrategyAdvanced {
            from,
            to,
            retry_count,
        } => println!(
            "[fallback] {} -> {} (attempt {})",
            from.label(),
            to.label(),
            retry_count + 1
        ),
        PlayerEvent::Advisory { message } => println!("[notice] {}", message),
        PlayerEvent::Failed { message, .. } => println!("[error] {}", message),
        PlayerEvent::RetryCeilingExceeded { message, .. } => println!("[failed] {}", message),
    }
}

/// One-line summary: name, year and runtime.
fn describe(item: &MediaItem) -> String {
    let mut line = item.name.clone();
    if let Some(series) = &item.series_name {
        line = format!("{} - {}", series, line);
    }
    if let Some(year) = item.production_year {
        line.push_str(&format!(" ({})", year));
    }
    if let Some(runtime) = item.runtime() {
        line.push_str(&format!(" [{}]", runtime));
    }
    line
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!(
                "  Server: {}",
                config.server.url.as_deref().unwrap_or("(not set)")
            );
            println!("  Client: {} on {}", config.client.client_name, config.client.device_name);
            println!("  Load timeout: {} ms", config.playback.load_timeout_ms);
            println!(
                "  Retry ceiling: {} attempts",
                config.playback.retry_ceiling()
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Load timeout: {} ms", config.playback.load_timeout_ms);
            println!(
                "  Retry ceiling: {} attempts",
                config.playback.retry_ceiling()
            );
        }
    }

    Ok(())
}
