use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use shopmate_agent::{
    DialogueRouter, KeywordNlu, RouterDeps, SessionRuntime, TemplateRenderer,
};
use shopmate_core::config::{AppConfig, LoadOptions};
use shopmate_core::{SessionId, UserProfile, WarrantyPolicy};
use shopmate_db::{
    connect_with_settings, migrations, FixtureEscalationGateway, FixtureOrderStore,
    FixtureSearchIndex, SqlConversationLog, SqlSessionStore,
};

/// Local REPL: the full dialogue stack (router, session runtime, sqlite
/// persistence) over the deterministic fixture catalog. Useful for poking at
/// flows without any external service.
pub fn run(options: LoadOptions) -> Result<()> {
    let config = AppConfig::load(options).context("loading configuration")?;
    super::init_logging(&config);

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async { chat_loop(config).await })
}

async fn chat_loop(config: AppConfig) -> Result<()> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .context("connecting to database")?;
    migrations::run_pending(&pool).await.context("applying migrations")?;

    let deps = RouterDeps {
        nlu: Arc::new(KeywordNlu),
        search: Arc::new(FixtureSearchIndex::seeded()),
        renderer: Arc::new(TemplateRenderer),
        escalation: Arc::new(FixtureEscalationGateway::succeeding()),
        orders: Arc::new(FixtureOrderStore::seeded()),
        log: Arc::new(SqlConversationLog::new(pool.clone())),
    };

    let router = Arc::new(DialogueRouter::new(
        deps,
        config.dialogue.clone(),
        WarrantyPolicy::default(),
    ));
    let session_runtime = SessionRuntime::new(
        router,
        Arc::new(SqlSessionStore::new(pool.clone())),
        Arc::new(SqlConversationLog::new(pool)),
    );

    let user = UserProfile::new("local", "operator");
    let session_id = SessionId("local-chat".to_string());

    println!("shopmate chat — type a message, 'menu' to reset, ctrl-d to quit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let reply = session_runtime.dispatch(&session_id, &user, message).await;

        println!("{}", reply.response);
        if !reply.buttons.is_empty() {
            println!("[{}]", reply.buttons.join(" | "));
        }
        if reply.escalated {
            println!("(session handed off to a human agent)");
            break;
        }
    }

    session_runtime.end_session(&session_id).await;
    Ok(())
}
