use screenshot_tester::args::{Args, Mode, WEBDRIVER_ENV};
use screenshot_tester::capture::XcapCapture;
use screenshot_tester::config::TesterConfig;
use screenshot_tester::diagnostics::FileSink;
use screenshot_tester::error::TesterResult;
use screenshot_tester::scenario::ScenarioReport;
use screenshot_tester::template_matching::MatchPoller;
use screenshot_tester::tester::ScreenTester;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(code) => return ExitCode::from(code),
    };

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let env_webdriver = std::env::var(WEBDRIVER_ENV).ok();
    let config = match args.to_config(env_webdriver, XcapCapture::primary_scale_factor) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::from(2);
        }
    };

    let result = match args.mode {
        Mode::Screenshot => screenshot(&config).map(|_| true),
        Mode::Scenario => run_scenario(&args, config),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::from(2)
        }
    }
}

fn screenshot(config: &TesterConfig) -> TesterResult<()> {
    println!("📸 Capturing desktop...");
    let sink = FileSink::new(&config.screenshots_dir)?;
    let mut poller = MatchPoller::new(config, Box::new(XcapCapture::new()?), Box::new(sink));
    let path = poller.take_desktop_screenshot(None)?;
    println!("✅ Screenshot saved to {}", path.display());
    Ok(())
}

fn run_scenario(args: &Args, config: TesterConfig) -> TesterResult<bool> {
    let Some(scenario) = args.to_scenario() else {
        return Ok(false);
    };

    let report = scenario.run_and_close(ScreenTester::launch(config)?)?;
    print_summary(&report);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(path, json)?;
        println!("📝 Report written to {}", path.display());
    }
    Ok(report.passed())
}

fn print_summary(report: &ScenarioReport) {
    println!();
    println!("Scenario: {}", report.url);
    match report.target {
        Some(m) => println!(
            "  target:        found at {:?} (score {:.4})",
            m.coords(),
            m.score
        ),
        None => match report.target_best_seen {
            Some(b) => println!(
                "  target:        not found (best {:.4} at {},{})",
                b.score, b.x, b.y
            ),
            None => println!("  target:        not found"),
        },
    }
    if let Some(e) = &report.click_error {
        println!("  click:         failed ({e})");
    }
    if let Some(url) = &report.url_after_click {
        println!("  url after:     {url}");
    }
    if let Some(m) = report.verification {
        println!(
            "  verification:  found at {:?} (score {:.4})",
            m.coords(),
            m.score
        );
    }
    println!("  status:        {:?}", report.status);
}
