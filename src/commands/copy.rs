//! Copy command

use indicatif::{ProgressBar, ProgressStyle};
use obcmem_core::config::BoardConfig;
use obcmem_core::transfer::{TransferProgress, TransferRequest, TransferStats};
use obcmem_core::Status;
use std::time::Duration;

use super::{bring_up, CommandError};
use crate::cli::CopyArgs;

/// Progress reporter backed by an indicatif bar
struct IndicatifProgress {
    bar: Option<ProgressBar>,
    erased: u32,
}

impl IndicatifProgress {
    fn new() -> Self {
        Self {
            bar: None,
            erased: 0,
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl TransferProgress for IndicatifProgress {
    fn started(&mut self, total_bytes: u32) {
        let bar = ProgressBar::new(total_bytes as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        self.bar = Some(bar);
    }

    fn erased(&mut self, addr: u32, len: u32) {
        self.erased += 1;
        log::trace!("Erased 0x{:08X}..+0x{:X}", addr, len);
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{} unit(s) erased", self.erased));
        }
    }

    fn advanced(&mut self, bytes_done: u32) {
        if let Some(bar) = &self.bar {
            bar.set_position(bytes_done as u64);
        }
    }
}

/// Run a copy on a simulated board
pub fn run_copy(config: &BoardConfig, args: &CopyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (dispatcher, _sim) = bring_up(config)?;

    if args.seed {
        let data: Vec<u8> = (0..args.len).map(|i| i as u8).collect();
        dispatcher.write_bytes(args.src, &data, true)?;
        println!("Seeded {} bytes at 0x{:08X}", args.len, args.src);
    }

    let request = TransferRequest::new(args.dst, args.src, args.len).with_erase(args.erase);
    println!("Copying {}", request.spec);

    let stats = if args.queued {
        run_queued(&dispatcher, request)?
    } else {
        let mut progress = IndicatifProgress::new();
        let result = dispatcher.transfer_with_progress(&request.spec, &mut progress);
        progress.finish();
        result?
    };
    print_stats(&stats);

    if args.verify {
        verify(&dispatcher, args)?;
        println!("Verified: destination matches source");
    }

    Ok(())
}

fn run_queued(
    dispatcher: &obcmem_dispatch::Dispatcher,
    request: TransferRequest,
) -> Result<TransferStats, Box<dyn std::error::Error>> {
    let request = request.on_complete(|result| {
        log::debug!("Queued transfer completed, status {}", Status::from(result));
    });
    let ticket = dispatcher.enqueue(request)?;
    println!("Transfer accepted ({} queued)", dispatcher.queued());

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Waiting for worker...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = ticket.wait();
    spinner.finish_and_clear();

    Ok(result?)
}

fn print_stats(stats: &TransferStats) {
    if stats.direct {
        println!("Copied {} bytes directly", stats.bytes);
    } else {
        println!(
            "Copied {} bytes in {} chunk(s), {} erase unit(s) erased",
            stats.bytes, stats.chunks, stats.erases
        );
    }
}

fn verify(
    dispatcher: &obcmem_dispatch::Dispatcher,
    args: &CopyArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut src = vec![0u8; args.len as usize];
    let mut dst = vec![0u8; args.len as usize];
    dispatcher.read_bytes(args.src, &mut src)?;
    dispatcher.read_bytes(args.dst, &mut dst)?;

    match src.iter().zip(&dst).position(|(a, b)| a != b) {
        Some(offset) => Err(CommandError::VerifyFailed(offset).into()),
        None => Ok(()),
    }
}
