/// Environment variable names
pub mod env {
    /// Variables that override `shipwright.toml`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ShipwrightEnvKey {
        ConfigPath,
        RootDir,
        DockerRepo,
        AgentCommand,
        BuildEnabled,
    }

    impl ShipwrightEnvKey {
        pub const ALL: [Self; 5] = [
            Self::ConfigPath,
            Self::RootDir,
            Self::DockerRepo,
            Self::AgentCommand,
            Self::BuildEnabled,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                Self::ConfigPath => "SHIPWRIGHT_CONFIG_PATH",
                Self::RootDir => "SHIPWRIGHT_ROOT_DIR",
                Self::DockerRepo => "SHIPWRIGHT_DOCKER_REPO",
                Self::AgentCommand => "SHIPWRIGHT_AGENT_COMMAND",
                Self::BuildEnabled => "SHIPWRIGHT_BUILD_ENABLED",
            }
        }
    }
}

/// Default configuration values
pub mod defaults {
    pub const CONFIG_FILE_NAME: &str = "shipwright.toml";

    pub const AGENT_COMMAND: &str = "gemini";
    pub const AGENT_ARGS: [&str; 2] = ["--experimental-acp", "-y"];
    /// Largest single frame accepted from the agent (10 MiB)
    pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

    pub const ROOT_DIR: &str = ".";
    pub const IMAGE_BUILDER: &str = "docker";

    pub const EVENT_AUTHOR: &str = "coding";
    pub const DOCKERFILE_PROMPT: &str = "Create or update appropriate Dockerfile";
    pub const DOCUMENTATION_PROMPT: &str = "Update GEMINI.md with information in this session";
}
