pub const SSD_URL: &str = "https://github.com/xinitronix/ssd_log";
pub const UNAME_URL: &str = "https://github.com/definitly486/uname";
pub const UNAME_PUSH_REMOTE: &str = "git@github.com:definitly486/uname.git";

/// The repositories the tool knows how to fetch out of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownRepo {
    Ssd,
    Uname,
}

impl KnownRepo {
    pub fn folder(&self) -> &'static str {
        match self {
            KnownRepo::Ssd => "ssd",
            KnownRepo::Uname => "uname",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            KnownRepo::Ssd => "ssd_log",
            KnownRepo::Uname => "uname",
        }
    }
}

/// Where to clone from and which folder to clone into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub url: String,
    pub folder: String,
    pub display: String,
}

impl RepoSpec {
    pub fn new(
        url: impl Into<String>,
        folder: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            folder: folder.into(),
            display: display.into(),
        }
    }
}
