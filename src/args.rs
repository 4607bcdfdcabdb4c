use crate::browser::BrowserKind;
use crate::config::TesterConfig;
use crate::error::TesterResult;
use crate::scenario::Scenario;
use crate::template_matching::MatchPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const WEBDRIVER_ENV: &str = "SCREENSHOT_TESTER_WEBDRIVER";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Scenario,
    Screenshot,
}

/// Capture-to-pointer scale from the command line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickScale {
    Fixed(f64),
    /// Read the primary monitor's scale factor at startup
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub url: Option<String>,
    pub target: Option<PathBuf>,
    pub verify: Option<PathBuf>,
    pub threshold: Option<f32>,
    pub verify_threshold: Option<f32>,
    pub timeout: Option<Duration>,
    pub verify_timeout: Option<Duration>,
    pub screenshots_dir: Option<PathBuf>,
    pub browser: Option<BrowserKind>,
    pub headless: bool,
    pub webdriver_url: Option<String>,
    pub click_scale: Option<ClickScale>,
    pub policy: Option<MatchPolicy>,
    pub report: Option<PathBuf>,
    pub debug: bool,
}

#[derive(Debug, PartialEq)]
pub enum Action {
    Run(Box<Args>),
    Help,
    Version,
}

fn parse_number<T: std::str::FromStr>(flag: &str, val: &str) -> Result<T, String> {
    val.parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {val}"))
}

/// Non-negative seconds that fit in a `Duration`
fn parse_secs(flag: &str, val: &str) -> Result<Duration, String> {
    let secs: f64 = parse_number(flag, val)?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("Invalid {flag} value: {val}"))
}

impl Args {
    /// Parse the process arguments; prints help, version or errors itself.
    /// `Err` carries the exit code to use.
    pub fn parse() -> Result<Option<Self>, u8> {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(&args) {
            Ok(Action::Run(args)) => Ok(Some(*args)),
            Ok(Action::Help) => {
                print_help();
                Ok(None)
            }
            Ok(Action::Version) => {
                println!(
                    "Screenshot Tester v{} ({})",
                    env!("APP_VERSION_DISPLAY"),
                    env!("APP_BUILD_YEAR")
                );
                Ok(None)
            }
            Err(msg) => {
                eprintln!("❌ {}", msg);
                print_help();
                Err(2)
            }
        }
    }

    /// Parse flags (program name already removed)
    pub fn parse_from(args: &[String]) -> Result<Action, String> {
        let mut parsed = Args {
            mode: Mode::Scenario,
            url: None,
            target: None,
            verify: None,
            threshold: None,
            verify_threshold: None,
            timeout: None,
            verify_timeout: None,
            screenshots_dir: None,
            browser: None,
            headless: false,
            webdriver_url: None,
            click_scale: None,
            policy: None,
            report: None,
            debug: false,
        };

        for arg in args {
            if arg == "--help" || arg == "-h" {
                return Ok(Action::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Action::Version);
            } else if arg == "--debug" {
                parsed.debug = true;
            } else if arg == "--headless" {
                parsed.headless = true;
            } else if arg == "--screenshot" || arg == "-s" {
                parsed.mode = Mode::Screenshot;
            } else if let Some(val) = arg.strip_prefix("--url=") {
                parsed.url = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--target=") {
                parsed.target = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--verify=") {
                parsed.verify = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--threshold=") {
                parsed.threshold = Some(parse_number("threshold", val)?);
            } else if let Some(val) = arg.strip_prefix("--verify-threshold=") {
                parsed.verify_threshold = Some(parse_number("verify-threshold", val)?);
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                parsed.timeout = Some(parse_secs("timeout", val)?);
            } else if let Some(val) = arg.strip_prefix("--verify-timeout=") {
                parsed.verify_timeout = Some(parse_secs("verify-timeout", val)?);
            } else if let Some(val) = arg.strip_prefix("--screenshots-dir=") {
                parsed.screenshots_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--browser=") {
                parsed.browser = Some(val.parse().map_err(|e| format!("{e}"))?);
            } else if let Some(val) = arg.strip_prefix("--webdriver=") {
                parsed.webdriver_url = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--click-scale=") {
                parsed.click_scale = Some(if val == "auto" {
                    ClickScale::Auto
                } else {
                    ClickScale::Fixed(parse_number("click-scale", val)?)
                });
            } else if let Some(val) = arg.strip_prefix("--policy=") {
                parsed.policy = Some(match val {
                    "first" => MatchPolicy::FirstQualifying,
                    "best" => MatchPolicy::BestQualifying,
                    other => {
                        return Err(format!(
                            "Unknown policy '{other}', expected 'first' or 'best'"
                        ));
                    }
                });
            } else if let Some(val) = arg.strip_prefix("--report=") {
                parsed.report = Some(PathBuf::from(val));
            } else {
                return Err(format!("Unknown argument: {arg}"));
            }
        }

        if parsed.mode == Mode::Scenario {
            for (flag, missing) in [
                ("--url", parsed.url.is_none()),
                ("--target", parsed.target.is_none()),
                ("--verify", parsed.verify.is_none()),
            ] {
                if missing {
                    return Err(format!("{flag} is required unless --screenshot is given"));
                }
            }
        }

        Ok(Action::Run(Box::new(parsed)))
    }

    /// Build the tester configuration. `env_webdriver` is the value of
    /// `SCREENSHOT_TESTER_WEBDRIVER`; `--webdriver` wins over it.
    /// `auto_scale` is only called for `--click-scale=auto`.
    pub fn to_config(
        &self,
        env_webdriver: Option<String>,
        auto_scale: impl FnOnce() -> TesterResult<f64>,
    ) -> TesterResult<TesterConfig> {
        let mut config = TesterConfig::default();
        if let Some(browser) = self.browser {
            config = config.with_browser(browser);
        }
        config.headless = self.headless;
        if let Some(dir) = &self.screenshots_dir {
            config.screenshots_dir = dir.clone();
        }
        if let Some(url) = self.webdriver_url.clone().or(env_webdriver) {
            config.webdriver_url = url;
        }
        if let Some(policy) = self.policy {
            config.match_policy = policy;
        }
        if let Some(threshold) = self.threshold {
            config.default_threshold = threshold;
        }
        if let Some(timeout) = self.timeout {
            config.default_timeout = timeout;
        }
        match self.click_scale {
            Some(ClickScale::Fixed(scale)) => config.capture_to_input_scale = scale,
            Some(ClickScale::Auto) => {
                config.capture_to_input_scale = auto_scale()?;
                log::info!(
                    "🖥️ Using monitor scale factor {}",
                    config.capture_to_input_scale
                );
            }
            None => {}
        }
        config.validate()?;
        Ok(config)
    }

    /// Scenario for the given flags; `None` in screenshot mode
    pub fn to_scenario(&self) -> Option<Scenario> {
        let (url, target, verify) = match (&self.url, &self.target, &self.verify) {
            (Some(u), Some(t), Some(v)) => (u, t, v),
            _ => return None,
        };
        let mut scenario = Scenario::new(url.clone(), target.clone(), verify.clone());
        if let Some(threshold) = self.threshold {
            scenario.target_threshold = threshold;
        }
        if let Some(threshold) = self.verify_threshold {
            scenario.verify_threshold = threshold;
        }
        if let Some(timeout) = self.timeout {
            scenario.target_timeout = timeout;
        }
        if let Some(timeout) = self.verify_timeout {
            scenario.verify_timeout = timeout;
        }
        Some(scenario)
    }
}

pub fn print_help() {
    println!("🖼️ Screenshot Tester - visual UI checks by template matching");
    println!();
    println!("USAGE:");
    println!("    screenshot-tester --url=<URL> --target=<PNG> --verify=<PNG> [FLAGS]");
    println!("    screenshot-tester --screenshot [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --url=<URL>               Page to open");
    println!("    --target=<PNG>            Reference image of the element to click");
    println!("    --verify=<PNG>            Reference image expected after the click");
    println!("    --threshold=N             Target match threshold (default: 0.6)");
    println!("    --verify-threshold=N      Verification match threshold (default: 0.5)");
    println!("    --timeout=SECS            Target search timeout (default: 10)");
    println!("    --verify-timeout=SECS     Verification search timeout (default: 5)");
    println!("    --screenshots-dir=<DIR>   Where screenshots and debug images go (default: screenshots)");
    println!("    --browser=<chrome|firefox> Browser to drive (default: chrome)");
    println!("    --headless                Run the browser without a window");
    println!(
        "    --webdriver=<URL>         WebDriver endpoint (default: {})",
        crate::config::DEFAULT_WEBDRIVER_URL
    );
    println!("    --click-scale=<N|auto>    Capture pixels per pointer unit (default: 1)");
    println!("    --policy=<first|best>     Return the first or the best qualifying match (default: first)");
    println!("    --report=<FILE>           Write the scenario result as JSON");
    println!("    --screenshot, -s          Save one desktop screenshot and exit");
    println!("    --debug                   Enable debug logging");
    println!("    --help, -h                Show this help message");
    println!("    --version, -v             Show version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    {WEBDRIVER_ENV}  WebDriver endpoint when --webdriver is not given");
    println!("    RUST_LOG                     Log filter (overrides --debug)");
    println!();
    println!("EXAMPLES:");
    println!("    screenshot-tester --screenshot");
    println!("    screenshot-tester --url=https://example.com --target=button.png --verify=after.png");
    println!("    screenshot-tester --url=http://localhost:3000 --target=b.png --verify=a.png --click-scale=auto --report=result.json");
}
