use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::containers::runner::{CommandOutput, CommandRunner, ProcessRunner};
use crate::error::{GenAiError, GenAiResult};

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs once the container is up and ready, before it is handed to the caller
#[async_trait]
pub trait PostStartHook: Send + Sync {
    async fn post_start(&self, container: &Container) -> GenAiResult<()>;
}

/// What to start and how
#[derive(Clone)]
pub struct ContainerRequest {
    pub image: String,
    pub name: Option<String>,
    /// attach to an existing container with the same name instead of creating one
    pub reuse: bool,
    pub exposed_port: u16,
    pub platform: Option<String>,
    pub env: Vec<(String, String)>,
    /// HTTP path answering 2xx once the service is ready
    pub wait_path: Option<String>,
    pub startup_timeout: Duration,
    pub hooks: Vec<Arc<dyn PostStartHook>>,
}

impl fmt::Debug for ContainerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRequest")
            .field("image", &self.image)
            .field("name", &self.name)
            .field("reuse", &self.reuse)
            .field("exposed_port", &self.exposed_port)
            .field("platform", &self.platform)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl ContainerRequest {
    pub fn new<S: Into<String>>(image: S, exposed_port: u16) -> Self {
        Self {
            image: image.into(),
            name: None,
            reuse: false,
            exposed_port,
            platform: None,
            env: Vec::new(),
            wait_path: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            hooks: Vec::new(),
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    pub fn with_platform<S: Into<String>>(mut self, platform: S) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_wait_path<S: Into<String>>(mut self, path: S) -> Self {
        self.wait_path = Some(path.into());
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostStartHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Arguments of `docker run`
    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-d".to_string()];
        if let Some(name) = &self.name {
            args.extend(["--name".to_string(), name.clone()]);
        }
        if let Some(platform) = &self.platform {
            args.extend(["--platform".to_string(), platform.clone()]);
        }
        for (key, value) in &self.env {
            args.extend(["-e".to_string(), format!("{}={}", key, value)]);
        }
        args.extend(["-p".to_string(), format!("{}/tcp", self.exposed_port)]);
        args.push(self.image.clone());
        args
    }
}

/// Talks to the container runtime through the docker cli
#[derive(Clone)]
pub struct Docker {
    runner: Arc<dyn CommandRunner>,
    program: String,
    host: String,
}

impl Default for Docker {
    fn default() -> Self {
        Self::new(Arc::new(ProcessRunner))
    }
}

impl Docker {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            program: "docker".to_string(),
            host: std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string()),
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    async fn docker(&self, args: Vec<String>) -> GenAiResult<CommandOutput> {
        self.runner.run(&self.program, &args).await
    }

    /// Run docker and fail on a non-zero exit code
    async fn docker_ok(&self, args: Vec<String>) -> GenAiResult<String> {
        let command = args.join(" ");
        let output = self.docker(args).await?;
        if !output.success() {
            return Err(GenAiError::Container(format!(
                "docker {} exited with {}: {}",
                command,
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    pub async fn image_exists(&self, image: &str) -> GenAiResult<bool> {
        let output = self.docker(vec!["image".into(), "inspect".into(), image.into()]).await?;
        Ok(output.success())
    }

    /// Id of the container with exactly this name, running or not
    pub async fn find_container(&self, name: &str) -> GenAiResult<Option<String>> {
        let id = self
            .docker_ok(vec![
                "ps".into(),
                "-a".into(),
                "--filter".into(),
                format!("name=^/{}$", name),
                "--format".into(),
                "{{.ID}}".into(),
            ])
            .await?;
        Ok(id.lines().next().map(str::to_string).filter(|id| !id.is_empty()))
    }

    async fn create_or_reuse(&self, request: &ContainerRequest) -> GenAiResult<(String, bool)> {
        if let (true, Some(name)) = (request.reuse, &request.name) {
            if let Some(id) = self.find_container(name).await? {
                info!(target: "genai::container", "reusing container {} ({})", name, id);
                self.docker_ok(vec!["start".into(), id.clone()]).await?;
                return Ok((id, true));
            }
        }

        info!(target: "genai::container", "starting {}", request.image);
        let id = self.docker_ok(request.run_args()).await?;
        Ok((id, false))
    }

    /// Start the container, wait until it is ready, then run the post-start hooks.
    /// A container created here is removed again when readiness or a hook fails.
    pub async fn start(&self, request: &ContainerRequest) -> GenAiResult<Container> {
        let (id, reused) = self.create_or_reuse(request).await?;
        let mapping = self
            .docker_ok(vec!["port".into(), id.clone(), format!("{}/tcp", request.exposed_port)])
            .await?;
        let host_port = parse_host_port(&mapping).ok_or_else(|| {
            GenAiError::Container(format!("port {} is not published: {:?}", request.exposed_port, mapping))
        })?;

        let container = Container {
            docker: self.clone(),
            id,
            host: self.host.clone(),
            host_port,
        };

        if let Err(e) = self.prepare(&container, request, reused).await {
            if !reused {
                if let Err(cleanup) = container.terminate().await {
                    warn!(target: "genai::container", "cleanup of {} failed: {}", container.id, cleanup);
                }
            }
            return Err(e);
        }

        Ok(container)
    }

    async fn prepare(&self, container: &Container, request: &ContainerRequest, reused: bool) -> GenAiResult<()> {
        if let Some(path) = &request.wait_path {
            container.wait_http(path, request.startup_timeout).await?;
        }
        // a reused container went through its hooks when it was created
        if !reused {
            for hook in &request.hooks {
                hook.post_start(container).await?;
            }
        }
        Ok(())
    }
}

/// First host port of `docker port` output such as `0.0.0.0:49153` or `[::]:49153`
pub fn parse_host_port(output: &str) -> Option<u16> {
    output
        .lines()
        .filter_map(|line| line.trim().rsplit_once(':'))
        .find_map(|(_, port)| port.parse().ok())
}

/// A started container
#[derive(Clone)]
pub struct Container {
    docker: Docker,
    pub id: String,
    pub host: String,
    pub host_port: u16,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("host_port", &self.host_port)
            .finish()
    }
}

impl Container {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.host_port)
    }

    /// Run a command inside the container, returns its exit code and combined output
    pub async fn exec(&self, command: &[String]) -> GenAiResult<(i32, String)> {
        let mut args = vec!["exec".to_string(), self.id.clone()];
        args.extend(command.iter().cloned());
        let output = self.docker.docker(args).await?;
        debug!(target: "genai::container", "exec {:?} returned {}", command, output.exit_code);
        Ok((output.exit_code, format!("{}{}", output.stdout, output.stderr)))
    }

    /// Save the container state as `image`
    pub async fn commit(&self, image: &str) -> GenAiResult<()> {
        info!(target: "genai::container", "committing {} as {}", self.id, image);
        self.docker.docker_ok(vec!["commit".into(), self.id.clone(), image.into()]).await?;
        Ok(())
    }

    pub async fn terminate(&self) -> GenAiResult<()> {
        info!(target: "genai::container", "removing container {}", self.id);
        self.docker.docker_ok(vec!["rm".into(), "-f".into(), "-v".into(), self.id.clone()]).await?;
        Ok(())
    }

    async fn wait_http(&self, path: &str, timeout: Duration) -> GenAiResult<()> {
        let url = format!("http://{}{}", self.endpoint(), path);
        let client = reqwest::Client::new();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // a server that accepts but never answers must not outlive the deadline
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let attempt_timeout = PROBE_TIMEOUT.min(remaining).max(POLL_INTERVAL);
            match client.get(&url).timeout(attempt_timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(target: "genai::container", "{} is ready", url);
                    return Ok(());
                }
                Ok(response) => debug!(target: "genai::container", "{} answered {}", url, response.status()),
                Err(e) => debug!(target: "genai::container", "{} not reachable yet: {}", url, e),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(GenAiError::Container(format!("{} not ready after {:?}", url, timeout)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
