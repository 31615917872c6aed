//! Runner that drives the registry browser and the Livy job tailer from the CLI

use crate::cli::args::{Args, ClusterArgs, Command, RegistryArgs};
use crate::config::{
    registry_token_from_env, skip_tls_from_env, ClusterConfig, HttpConfig, RegistryConfig,
};
use crate::error::{Result, ToolkitError};
use crate::livy::{ConsoleConsumer, JobLogTailer, KillSwitch, LivyClient, SubmissionParameters, TailOutcome};
use crate::logging::Logger;
use crate::registry::{Direction, Listing, RegistryBrowser, RegistryClient};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

pub struct Runner {
    args: Args,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        args.validate()?;

        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Ok(Self { args, output })
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Command::Repos { registry, pages } => {
                let mut browser = self.browser(registry)?;
                self.list_pages(&mut browser, Listing::Repositories, *pages)
                    .await
            }
            Command::Tags {
                registry,
                repository,
                pages,
            } => {
                let mut browser = self.browser(registry)?;
                browser.select_repository(repository);
                self.list_pages(&mut browser, Listing::Tags, *pages).await
            }
            Command::Browse { registry } => {
                let mut browser = self.browser(registry)?;
                self.browse(&mut browser).await
            }
            Command::Submit {
                cluster,
                job,
                no_tail,
            } => {
                let client = self.livy_client(cluster)?;
                let batch_id = self.submit(&client, job).await?;
                if *no_tail {
                    Ok(())
                } else {
                    self.tail(client, batch_id).await
                }
            }
            Command::Tail { cluster, batch_id } => {
                let client = self.livy_client(cluster)?;
                self.tail(client, *batch_id).await
            }
            Command::Kill { cluster, batch_id } => {
                let client = self.livy_client(cluster)?;
                client.kill_batch(*batch_id).await?;
                self.output
                    .success(&format!("Kill request sent for batch {}", batch_id));
                Ok(())
            }
        }
    }

    fn http_config(&self) -> Result<HttpConfig> {
        HttpConfig::new(skip_tls_from_env(self.args.skip_tls), self.args.timeout)
    }

    fn browser(&self, args: &RegistryArgs) -> Result<RegistryBrowser<RegistryClient>> {
        let config = RegistryConfig::resolve(
            args.registry.clone(),
            args.username.clone(),
            args.password.clone(),
            args.page_size,
            self.http_config()?,
        )?;

        let token = registry_token_from_env(args.token.clone());

        self.output.section(&format!("Registry {}", config.host()));
        if config.auth.has_auth() {
            self.output.verbose("Using basic auth for registry requests");
        } else if token.is_some() {
            self.output.verbose("Using bearer token for registry requests");
        } else {
            self.output
                .verbose("No registry credentials provided, proceeding without auth");
        }

        let page_size = config.page_size;
        let client = RegistryClient::builder(config)
            .with_auth_token(token)
            .with_output(self.output.clone())
            .build()?;
        Ok(RegistryBrowser::new(client, page_size, self.output.clone()))
    }

    fn livy_client(&self, args: &ClusterArgs) -> Result<LivyClient> {
        let config = ClusterConfig::resolve(
            args.cluster.clone(),
            args.username.clone(),
            args.password.clone(),
            self.http_config()?,
        )?;
        self.output.verbose(&format!("Livy endpoint: {}", config.batches_url()));
        LivyClient::new(config, self.output.clone())
    }

    async fn list_pages(
        &self,
        browser: &mut RegistryBrowser<RegistryClient>,
        listing: Listing,
        pages: usize,
    ) -> Result<()> {
        for page in 1..=pages {
            let items = match self.turn_page(browser, listing, Direction::Forward).await? {
                Some(items) => items,
                None => break,
            };
            self.output
                .list(&format!("{} (page {})", listing_title(browser, listing), page), &items);

            if !browser.cursor(listing).has_next() {
                break;
            }
        }

        if browser.cursor(listing).has_next() {
            self.output
                .info("More entries available, use --pages to fetch further");
        }
        Ok(())
    }

    async fn turn_page(
        &self,
        browser: &mut RegistryBrowser<RegistryClient>,
        listing: Listing,
        direction: Direction,
    ) -> Result<Option<Vec<String>>> {
        match listing {
            Listing::Repositories => browser.list_repositories(direction).await,
            Listing::Tags => browser.list_tags(direction).await,
        }
    }

    /// Interactive paging over stdin
    async fn browse(&self, browser: &mut RegistryBrowser<RegistryClient>) -> Result<()> {
        self.output
            .info("Commands: n/p (repositories), t <repo>, tn/tp (tags), q");
        self.show_page(browser, Listing::Repositories, Direction::Forward)
            .await;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.output.prompt(">");
            let Some(line) = lines.next_line().await? else {
                break;
            };

            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some("q"), _) => break,
                (Some("n"), None) => {
                    self.show_page(browser, Listing::Repositories, Direction::Forward)
                        .await
                }
                (Some("p"), None) => {
                    self.show_page(browser, Listing::Repositories, Direction::Backward)
                        .await
                }
                (Some("t"), Some(repository)) => {
                    browser.select_repository(repository);
                    self.show_page(browser, Listing::Tags, Direction::Forward)
                        .await
                }
                (Some("tn"), None) => {
                    self.show_page(browser, Listing::Tags, Direction::Forward)
                        .await
                }
                (Some("tp"), None) => {
                    self.show_page(browser, Listing::Tags, Direction::Backward)
                        .await
                }
                (None, _) => {}
                _ => self.output.warning(&format!("Unknown command: {}", line.trim())),
            }
        }
        Ok(())
    }

    /// Fetch and print one page. Errors are reported and browsing goes on.
    async fn show_page(
        &self,
        browser: &mut RegistryBrowser<RegistryClient>,
        listing: Listing,
        direction: Direction,
    ) {
        match self.turn_page(browser, listing, direction).await {
            Ok(Some(items)) => {
                self.output.list(&listing_title(browser, listing), &items);
                let cursor = browser.cursor(listing);
                self.output.detail(&format!(
                    "previous: {}, next: {}",
                    if cursor.has_previous() { "yes" } else { "no" },
                    if cursor.has_next() { "yes" } else { "no" }
                ));
            }
            Ok(None) => self.output.info(match direction {
                Direction::Forward => "Already at the last page",
                Direction::Backward => "Already at the first page",
            }),
            Err(e) => self.output.error(&e.to_string()),
        }
    }

    async fn submit(&self, client: &LivyClient, job: &Path) -> Result<i64> {
        self.output.section("Spark batch submission");

        let content = tokio::fs::read_to_string(job).await.map_err(|e| {
            ToolkitError::Io(format!("Failed to read job file {}: {}", job.display(), e))
        })?;
        let params: SubmissionParameters = serde_json::from_str(&content).map_err(|e| {
            ToolkitError::Parse(format!("Invalid job file {}: {}", job.display(), e))
        })?;

        self.output.summary_kv(
            "Submission",
            &[
                ("Cluster", client.config().url.clone()),
                ("Artifact", params.file.clone()),
                ("Main class", params.class_name.clone().unwrap_or_default()),
                ("Arguments", params.args.join(" ")),
            ],
        );

        self.output.step("Submitting batch to Livy");
        let batch = client.submit_batch(&params).await?;
        let batch_id = batch.id.ok_or_else(|| {
            ToolkitError::Livy("Submission response carried no batch id".to_string())
        })?;
        self.output.success(&format!(
            "Submitted batch {} (state: {})",
            batch_id, batch.state
        ));
        Ok(batch_id)
    }

    async fn tail(&self, client: LivyClient, batch_id: i64) -> Result<()> {
        let kill = KillSwitch::new();
        let on_interrupt = kill.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.kill();
            }
        });

        self.output
            .verbose("Press Ctrl-C to kill the job and stop following its log");

        let mut consumer = ConsoleConsumer::new(self.output.clone(), batch_id);
        let mut tailer = JobLogTailer::new(client.clone(), batch_id, kill, self.output.clone());
        let result = tailer.run(&mut consumer).await;
        interrupt.abort();

        match result? {
            TailOutcome::Succeeded => {
                self.output.verbose(&format!(
                    "Followed batch {} for {}",
                    batch_id,
                    self.output.format_duration(self.output.elapsed())
                ));
                Ok(())
            }
            TailOutcome::Failed => Err(ToolkitError::Livy(format!(
                "Spark batch {} failed",
                batch_id
            ))),
            TailOutcome::Killed => {
                if let Err(e) = client.kill_batch(batch_id).await {
                    self.output
                        .warning(&format!("Kill request for batch {} failed: {}", batch_id, e));
                } else {
                    self.output.info(&format!("Batch {} killed", batch_id));
                }
                Ok(())
            }
        }
    }
}

fn listing_title<A: crate::registry::RegistryApi>(browser: &RegistryBrowser<A>, listing: Listing) -> String {
    match (listing, browser.selected_repository()) {
        (Listing::Tags, Some(repository)) => format!("Tags of {}", repository),
        (Listing::Tags, None) => "Tags".to_string(),
        (Listing::Repositories, _) => "Repositories".to_string(),
    }
}
