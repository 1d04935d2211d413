use {
    anyhow::Result,
    clap::Parser,
    collab_rl::cli::{
        run,
        Args,
    },
};

fn main() -> Result<()> {
    run(Args::parse())
}
