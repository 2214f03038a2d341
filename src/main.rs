mod args;
mod progress;

use crate::args::{ApiArgs, Args, Commands, DownloadArgs, StatusArgs, SubmitArgs, WaitArgs};
use crate::progress::ApiProgress;

use backon::{BlockingRetryable, ExponentialBuilder};
use clap::Parser;
use std::{path::Path, time::Duration};
use x_checker::{
    api::{ApiClientError, TaskClient, TaskRecord},
    config::ClientConfig,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let Args { api, command } = Args::parse();
    let ApiArgs {
        api_key,
        url,
        retries,
    } = api;

    let api_key = api_key.ok_or(ApiClientError::MissingApiKey)?;
    let client = TaskClient::new(ClientConfig::new(api_key).with_base_url(url))?;

    match command {
        Commands::Submit(args) => submit(&client, args)?,
        Commands::Status(args) => status(&client, args, retries)?,
        Commands::Download(DownloadArgs { result_url, output }) => {
            download(&client, &result_url, &output, retries)?;
        }
    }
    Ok(())
}

/// Caller side retry for idempotent calls. The client itself never retries.
fn with_retries<T>(
    retries: usize,
    what: &str,
    call: impl FnMut() -> Result<T, ApiClientError>,
) -> Result<T, ApiClientError> {
    call.retry(
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30))
            .with_max_times(retries),
    )
    .when(ApiClientError::is_transient)
    .notify(|err: &ApiClientError, dur: Duration| {
        log::warn!("{what} failed with {}, retrying in {dur:?}", err.error_code());
    })
    .call()
}

fn submit(client: &TaskClient, args: SubmitArgs) -> Result<(), ApiClientError> {
    let SubmitArgs {
        input,
        user_id,
        wait,
    } = args;

    let progress = ApiProgress::new_upload();
    let task = client.submit(input.into_input()).map_err(|err| {
        progress.finish_and_clear();
        err
    })?;
    progress.finish_and_clear();

    println!("Task ID: {}", task.task_id);
    println!("Initial Status: {}", task.status);

    if wait.should_wait() {
        let done = wait_for(client, &task.task_id, &user_id, &wait)?;
        report(&done);
        save_result(client, &done, wait.output.as_deref())?;
    }
    Ok(())
}

fn status(client: &TaskClient, args: StatusArgs, retries: usize) -> Result<(), ApiClientError> {
    let StatusArgs {
        task,
        user_id,
        wait,
    } = args;

    if wait.should_wait() {
        let done = wait_for(client, &task, &user_id, &wait)?;
        report(&done);
        return save_result(client, &done, wait.output.as_deref());
    }

    let record = with_retries(retries, "Status check", || client.check_status(&task, &user_id))?;
    report(&record);
    Ok(())
}

fn download(
    client: &TaskClient,
    result_url: &str,
    output: &Path,
    retries: usize,
) -> Result<(), ApiClientError> {
    let progress = ApiProgress::new_download();
    let saved = with_retries(retries, "Download", || client.fetch_result(result_url, output));
    progress.finish_and_clear();

    println!("Results saved to: {}", saved?.display());
    Ok(())
}

fn wait_for(
    client: &TaskClient,
    task_id: &str,
    user_id: &str,
    wait: &WaitArgs,
) -> Result<TaskRecord, ApiClientError> {
    let options = wait.poll_options();
    let progress = ApiProgress::new_polling();

    let result = client.poll_until_terminal(task_id, user_id, &options, |task| progress.observe(task));
    match &result {
        Ok(_) => progress.finish_with_message("✅ Task completed"),
        Err(ApiClientError::TaskFailed(_)) => progress.finish_with_message("❌ Task failed"),
        Err(_) => progress.finish_and_clear(),
    }
    result
}

fn report(task: &TaskRecord) {
    println!(
        "Status: {}, Success: {}, Failure: {}, Total: {}",
        task.status, task.success, task.failure, task.total
    );
    if let Some(updated) = task.updated_at() {
        println!("Last update: {updated}");
    }
    if let Some(url) = task.result_url() {
        println!("Results available at: {url}");
    }
}

fn save_result(
    client: &TaskClient,
    task: &TaskRecord,
    output: Option<&Path>,
) -> Result<(), ApiClientError> {
    let (Some(output), Some(url)) = (output, task.result_url()) else {
        return Ok(());
    };

    let progress = ApiProgress::new_download();
    let saved = client.fetch_result(url, output);
    progress.finish_and_clear();

    println!("Results saved to: {}", saved?.display());
    Ok(())
}
