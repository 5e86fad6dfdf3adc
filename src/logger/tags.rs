/// Log tags identify the subsystem a log line comes from
///
/// Each tag maps to a `--debug-<key>` flag that enables its debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Webserver,
    Hub,
    Store,
    Session,
    Traffic,
}

impl LogTag {
    /// Key used in --debug-<key> flags
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Webserver => "webserver",
            LogTag::Hub => "hub",
            LogTag::Store => "store",
            LogTag::Session => "session",
            LogTag::Traffic => "traffic",
        }
    }

    /// Uncolored label for file output
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }
}
