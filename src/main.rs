use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "flattar")]
#[command(about = "Flatten a Docker/OCI image archive into a single root-filesystem tarball")]
#[command(version = "0.1.0")]
struct Cli {
    /// Docker/OCI image tarball to flatten (must be a seekable file, not stdin)
    infile: PathBuf,

    /// Output path, or "-" for stdout
    outfile: String,

    /// Compress the output tar stream
    #[arg(long, value_enum, default_value = "none")]
    compress: Compress,
}

#[derive(Copy, Clone, ValueEnum)]
enum Compress {
    None,
    Gzip,
    Xz,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("flattar: {err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut input = File::open(&cli.infile)
        .map_err(|e| anyhow::anyhow!("open {}: {e}", cli.infile.display()))?;

    if cli.outfile == "-" {
        let stdout = io::stdout();
        let sink = BufWriter::new(stdout.lock());
        return write_compressed(sink, cli.compress, |w| {
            flattar::flatten(&mut input, w).map_err(anyhow::Error::from)
        });
    }

    let outfile = File::create(&cli.outfile)
        .map_err(|e| anyhow::anyhow!("create {}: {e}", cli.outfile))?;
    let sink = BufWriter::new(outfile);

    let result = write_compressed(sink, cli.compress, |w| {
        flattar::flatten(&mut input, w).map_err(anyhow::Error::from)
    });

    if result.is_err() {
        let _ = std::fs::remove_file(&cli.outfile);
    }

    result
}

/// Wraps `sink` in the requested compressor, runs `body`, and finalizes the
/// compressor so trailing frames get flushed.
fn write_compressed<W, F>(sink: W, compress: Compress, body: F) -> anyhow::Result<()>
where
    W: Write,
    F: FnOnce(&mut dyn Write) -> anyhow::Result<()>,
{
    match compress {
        Compress::None => {
            let mut sink = sink;
            body(&mut sink)
        }
        Compress::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(sink, flate2::Compression::default());
            body(&mut encoder)?;
            encoder.finish()?;
            Ok(())
        }
        Compress::Xz => {
            let mut encoder = xz2::write::XzEncoder::new(sink, 6);
            body(&mut encoder)?;
            encoder.finish()?;
            Ok(())
        }
    }
}
