use std::path::PathBuf;

use accrual_kernels::{
    make_many_earn_request_batches, make_many_earn_request_full_batches, EarnRequest, Program,
    Validate,
};
use serde::Serialize;

use super::{
    utils::{print_json, read_json, validate_all},
    Command, Context,
};

/// Partition a JSON array of earn requests into batches.
#[derive(Debug, clap::Args)]
pub struct Batch {
    /// Path to the input file. Read from stdin if not provided.
    input: Option<PathBuf>,
    /// Build batches of unrelated requests.
    #[arg(long)]
    full: bool,
    /// Scope the produced batches to this program.
    #[arg(long)]
    program: Option<i64>,
}

impl Command for Batch {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let requests: Vec<EarnRequest> = read_json(self.input.as_deref()).await?;
        validate_all(&requests)?;

        let batch_size = ctx.config().batch_size();
        if self.full {
            let batches = make_many_earn_request_full_batches(&requests, batch_size)?;
            self.output(batches)
        } else {
            let batches = make_many_earn_request_batches(&requests, batch_size)?;
            self.output(batches)
        }
    }
}

impl Batch {
    fn output<T: Serialize + Validate>(&self, batches: Vec<T>) -> eyre::Result<()> {
        validate_all(&batches)?;
        tracing::info!(batches = batches.len(), "made batches");
        match self.program {
            Some(program) => {
                let scoped = batches
                    .into_iter()
                    .map(|batch| Program::new(batch, program))
                    .collect::<Vec<_>>();
                validate_all(&scoped)?;
                print_json(&scoped)
            }
            None => print_json(&batches),
        }
    }
}
