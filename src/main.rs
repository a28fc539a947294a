use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cfg = spcparse::config::Config::parse();
    spcparse::block_on(spcparse::run(cfg))?
}
