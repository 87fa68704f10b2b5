use anyhow::{Context, Result};
use clap::Parser;
use demo::notes::{CreateNote, GetNote};
use demo::operations::GetOperation;
use demo::storage::{InMemoryUnitOfWork, Note};
use demo::{App, Transport, notes, operations};
use modkit_application::{AuthInfo, EventBusExt, ExecutionContext, OperationStatus, TracingLogger};
use modkit_domain::event::Event;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// 通过 modkit 运行时创建并读取一条笔记
#[derive(Parser, Debug)]
#[command(name = "modkit-demo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 事件传输方式
    #[arg(long, value_enum, default_value_t = Transport::Local)]
    transport: Transport,

    /// 笔记标题（为空时触发校验失败）
    #[arg(long, default_value = "hello")]
    title: String,

    #[arg(long, default_value = "written through the command bus")]
    content: String,

    /// 调用方角色，读取笔记需要 admin / editor / viewer
    #[arg(long, default_value = "editor")]
    role: String,

    #[arg(long, default_value = "user-1")]
    subject: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let app = App::start(cli.transport).await?;

    let ctx = ExecutionContext::builder()
        .auth(AuthInfo::authenticated(cli.subject.as_str(), cli.role.as_str()))
        .event_bus(app.bus.clone())
        .unit_of_work(Arc::new(InMemoryUnitOfWork::default()))
        .logger(Arc::new(TracingLogger::new()))
        .build();
    tracing::info!(trace_id = %ctx.trace_id(), transport = ?cli.transport, "request started");

    let command = CreateNote {
        title: cli.title,
        content: cli.content,
    };
    let mut handle = app.bus.publish(Event::new(command), &ctx).await?;
    let operation = handle.wait().await;

    let operations_module = app
        .module(operations::MODULE)
        .context("operations module is not registered")?;
    let record = operations_module.query::<GetOperation>(operation.id(), &ctx).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    if operation.status() == OperationStatus::Success {
        let created = operation
            .output::<Note>()
            .context("finished operation has no result")??;
        let notes_module = app
            .module(notes::MODULE)
            .context("notes module is not registered")?;
        match notes_module.query::<GetNote>(created.id, &ctx).await {
            Ok(note) => println!("{}", serde_json::to_string_pretty(&note)?),
            Err(err) => {
                tracing::warn!(error = %err, "note could not be read back");
                app.bus.publish_exception(err, None, &ctx).await?.wait().await;
            }
        }
    } else if let Some(Err(err)) = operation.result() {
        app.bus
            .publish_exception(err.clone(), Some(operation.id()), &ctx)
            .await?
            .wait()
            .await;
    }

    // 领域事件由命令处理器内部发布，这里给后台订阅者留出完成时间
    tokio::time::sleep(Duration::from_millis(50)).await;
    for notification in app.outbox.snapshot() {
        println!("{}", serde_json::to_string(&notification)?);
    }
    println!(
        "notes stored: {}, operations tracked: {}",
        app.repository.len().await,
        app.operations.count().await?
    );

    Ok(())
}
