#![deny(clippy::all)]
#![forbid(unsafe_code)]

use clap::Parser;
use dvlib::{
    cfg::{self, Cfg},
    dverr,
    reader::navigator_from_cfg,
    result::{to_dv, trace_ok_err, trace_ok_warn, DvResult, ErrorKind},
    tracing_setup, Navigator, ResultSharedImage,
};
use std::{
    io::{self, BufRead, Write},
    panic,
    path::PathBuf,
};
use tokio::runtime::Runtime;

mod detail {
    #[derive(Debug, PartialEq, Eq)]
    pub(super) enum Command {
        Fetch(String),
        Next,
        Previous,
        Current,
        Goto(String),
        Save,
        Stats,
        Help,
        Quit,
    }

    pub(super) const HELP: &str = "commands: f|fetch <1-n>, n|next, p|prev, c|current, \
                                   g|goto <idx>, s|save, stats, h|help, q|quit";

    pub(super) fn parse_command(line: &str) -> Result<Command, String> {
        let mut words = line.split_whitespace();
        let cmd = words.next().unwrap_or("");
        let arg = words.next().unwrap_or("").to_string();
        match cmd {
            "f" | "fetch" => Ok(Command::Fetch(arg)),
            "n" | "next" => Ok(Command::Next),
            "p" | "prev" | "previous" => Ok(Command::Previous),
            "c" | "current" => Ok(Command::Current),
            "g" | "goto" => Ok(Command::Goto(arg)),
            "s" | "save" => Ok(Command::Save),
            "stats" => Ok(Command::Stats),
            "h" | "help" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            _ => Err(format!("unknown command '{cmd}'. {HELP}")),
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("f 3"), Ok(Command::Fetch("3".into())));
        assert_eq!(parse_command("  fetch  "), Ok(Command::Fetch("".into())));
        assert_eq!(parse_command("n"), Ok(Command::Next));
        assert_eq!(parse_command("previous"), Ok(Command::Previous));
        assert_eq!(parse_command("g 2"), Ok(Command::Goto("2".into())));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert!(parse_command("jump").is_err());
        assert!(parse_command("").is_err());
    }
}
use detail::Command;

#[derive(Parser)]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " ", env!("GIT_HASH")),
    about = "Browse random dog images"
)]
struct Cli {
    /// Number of images to fetch at startup.
    #[arg(short, long)]
    count: Option<String>,
    /// Only fetch images of this breed, e.g., hound.
    #[arg(short, long)]
    breed: Option<String>,
    /// Folder for saved images.
    #[arg(short, long)]
    save_dir: Option<PathBuf>,
    /// Path to a toml config file, defaults to ~/.dogview/dv_cfg.toml.
    #[arg(long)]
    cfg: Option<PathBuf>,
}

struct Session<W: Write> {
    nav: Navigator,
    cfg: Cfg,
    rt: Runtime,
    out: W,
}

impl<W: Write> Session<W> {
    fn print(&mut self, line: &str) {
        trace_ok_err(writeln!(self.out, "{line}"));
    }

    fn show(&mut self, loaded: ResultSharedImage) {
        let state = self.nav.nav_state();
        let line = match loaded {
            Ok(im) => self
                .nav
                .current_url()
                .map(|url| dvlib::view::describe(state, url, &im)),
            Err(e) => Some(format!("Ops we have a problem! {e}")),
        };
        if let Some(line) = line {
            self.print(&line);
        }
        let buttons = dvlib::view::NavButtons::from_state(state);
        self.print(&format!("  {buttons}"));
    }

    /// Returns `false` once the user wants to quit.
    fn execute(&mut self, cmd: Command) -> DvResult<bool> {
        match cmd {
            Command::Fetch(count) => {
                let count = dvlib::view::parse_count(&count, self.cfg.max_count)?;
                let n_fetched = self.rt.block_on(self.nav.fetch(count))?;
                if n_fetched == 0 {
                    self.print("no images received");
                } else {
                    let loaded = self.rt.block_on(self.nav.current());
                    self.show(loaded);
                }
            }
            Command::Next => {
                let loaded = self.rt.block_on(self.nav.next());
                self.show(loaded);
            }
            Command::Previous => {
                let loaded = self.rt.block_on(self.nav.previous());
                self.show(loaded);
            }
            Command::Current => {
                let loaded = self.rt.block_on(self.nav.current());
                self.show(loaded);
            }
            Command::Goto(idx) => {
                let idx = idx
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| idx.checked_sub(1))
                    .ok_or_else(|| dverr!(Other, "goto needs a position starting at 1"))?;
                let loaded = self.rt.block_on(self.nav.select(idx));
                self.show(loaded);
            }
            Command::Save => {
                let im = self.rt.block_on(self.nav.current())?;
                let url = self
                    .nav
                    .current_url()
                    .ok_or_else(|| dverr!(OutOfRange, "no image to save"))?;
                let path = dvlib::file_util::save_image(&im, url, &self.cfg.save_dir())?;
                self.print(&format!("saved to {path:?}"));
            }
            Command::Stats => {
                let stats = self.nav.loader().stats();
                self.print(&format!("{stats:?}"));
            }
            Command::Help => self.print(detail::HELP),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn run<R: BufRead>(&mut self, input: R) -> DvResult<()> {
        self.print(detail::HELP);
        for line in input.lines() {
            let line = line.map_err(to_dv(ErrorKind::Other))?;
            if line.trim().is_empty() {
                continue;
            }
            let keep_going = match detail::parse_command(&line) {
                Ok(cmd) => match self.execute(cmd) {
                    Ok(keep_going) => keep_going,
                    Err(e) => {
                        tracing::info!("{e:?}");
                        self.print(&format!("Ops we have a problem! {e}"));
                        true
                    }
                },
                Err(msg) => {
                    self.print(&msg);
                    true
                }
            };
            if !keep_going {
                break;
            }
            trace_ok_warn(self.out.flush());
        }
        Ok(())
    }
}

fn run(cli: Cli) -> DvResult<()> {
    let mut cfg = match &cli.cfg {
        Some(path) => cfg::read_cfg_from_path(path)?,
        None => cfg::read_cfg()?,
    };
    if cli.breed.is_some() {
        cfg.breed = cli.breed;
    }
    if cli.save_dir.is_some() {
        cfg.save_dir = cli.save_dir;
    }
    let rt = Runtime::new().map_err(to_dv(ErrorKind::Other))?;
    let nav = navigator_from_cfg(&cfg)?;
    let mut session = Session {
        nav,
        cfg,
        rt,
        out: io::stdout(),
    };
    if let Some(count) = cli.count {
        if let Err(e) = session.execute(Command::Fetch(count)) {
            session.print(&format!("Ops we have a problem! {e}"));
        }
    }
    session.run(io::stdin().lock())
}

fn main() {
    let _guard_flush_to_logfile = tracing_setup::tracing_setup();
    let cli = Cli::parse();
    match panic::catch_unwind(|| run(cli)) {
        Ok(Ok(())) => tracing::info!("bye"),
        Ok(Err(e)) => {
            tracing::error!("{e:?}");
            eprintln!("{e}");
        }
        Err(e) => {
            tracing::error!("{e:?}");
            let b = tracing_setup::BACKTRACE.with(|b| b.borrow_mut().take());
            if let Some(b) = b {
                tracing::error!("{:?}", b);
            }
        }
    }
}

#[cfg(test)]
use {
    dvlib::test_helpers::{make_loader, urls, MockFetcher, MockUrlSource},
    std::{sync::Arc, time::Duration},
};

#[test]
fn test_session() {
    let fetcher = Arc::new(MockFetcher::new());
    let source = Arc::new(MockUrlSource::new(vec![Ok(urls(&[
        "https://x.org/a.png",
        "https://x.org/b.png",
    ]))]));
    let rt = Runtime::new().unwrap();
    let nav = Navigator::new(source, make_loader(fetcher, Duration::from_secs(5)));
    let mut session = Session {
        nav,
        cfg: Cfg::default(),
        rt,
        out: vec![],
    };
    let input = "fetch 11\nfetch 2\nn\nn\np\nwhat\nq\nn\n";
    session.run(input.as_bytes()).unwrap();
    let out = String::from_utf8(session.out).unwrap();
    assert!(out.contains("The number should be in range of 1 to 10"));
    assert!(out.contains("[1/2] https://x.org/a.png 2x2"));
    assert!(out.contains("[2/2] https://x.org/b.png 2x2"));
    assert!(out.contains("previous: on, next: off"));
    assert!(out.contains("out of range"));
    assert!(out.contains("unknown command 'what'"));
    assert_eq!(session.nav.current_idx(), Some(0));
}
