use clap::{crate_version, Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use visual_secret_sharing::algorithms::infer_block_width;
use visual_secret_sharing::config::AppConfig;
use visual_secret_sharing::raster::{
    load_rgb_grid, load_shares, reconstruction_path, save_binary_grid, write_session, LoadedShares,
};
use visual_secret_sharing::{
    binarize, infer_subpixels, reconstruct_from_grids, reconstruct_image, BinaryImage,
    VisualCryptography,
};

#[derive(Debug, Subcommand)]
enum CliArgument {
    /// Split an image into shares.
    Split {
        /// Image to split. Colours are thresholded to black and white.
        #[clap(long, short)]
        input: PathBuf,

        /// Share threshold.
        #[clap(long, short)]
        threshold: Option<usize>,

        /// Number of shares to generate.
        #[clap(long, short)]
        shares: Option<usize>,

        /// Label used for the session directory and share file names.
        #[clap(long, short)]
        label: Option<String>,

        /// Directory in which the session directory is created.
        #[clap(long, short)]
        output_dir: Option<PathBuf>,

        /// Seed for reproducible shares. Omit for OS randomness.
        #[clap(long)]
        seed: Option<u64>,

        /// Verbose mode displays the shares
        #[clap(long, short)]
        verbose: bool,
    },
    /// Combine share images to reconstruct the secret.
    Combine {
        /// Share files to stack.
        #[clap(long = "share", short, required = true, num_args = 1..)]
        shares: Vec<PathBuf>,

        /// Share threshold, checked when the shares carry no manifest.
        #[clap(long, short)]
        threshold: Option<usize>,

        /// Label for the reconstruction file name.
        #[clap(long, short)]
        label: Option<String>,

        /// Output file. Defaults to the directory of the first share.
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Show the layout of a share file.
    Inspect {
        /// Share file.
        #[clap(long, short)]
        share: PathBuf,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Parser, Debug)]
#[command(name = "vss")]
#[command(version = crate_version!())]
#[command(
    about = "VSS - visual secret sharing for black and white images",
    long_about = "Split an image into n share images so that stacking any k of them reveals the picture while fewer than k reveal nothing. Shares are written as PNG files into a session directory together with a manifest recording the scheme parameters. Combine reads the manifest when present and otherwise infers the subpixel layout from the pixels."
)]
struct Opt {
    /// Config file (defaults to ./vss.toml when present).
    #[clap(long, short)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[clap(subcommand)]
    argument: CliArgument,
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::parse();
    let config = AppConfig::load(opt.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    debug!("using config {:?}", config);

    match opt.argument {
        CliArgument::Split {
            input,
            threshold,
            shares,
            label,
            output_dir,
            seed,
            verbose,
        } => {
            let vc_config = config.vc_config(threshold, shares);
            let label = label.unwrap_or(config.label);
            let output_dir = output_dir.unwrap_or(config.output_dir);

            let vc = VisualCryptography::new(vc_config)?;
            let secret = binarize(&load_rgb_grid(&input)?)?;
            let shares = match seed {
                Some(seed) => vc.generate_shares(&secret, &mut StdRng::seed_from_u64(seed))?,
                None => vc.generate_shares(&secret, &mut rand::rng())?,
            };

            if verbose {
                for share in &shares {
                    println!("{}", share);
                }
            }

            let session = write_session(&output_dir, &label, &shares)?;
            println!(
                "({},{}) scheme, {} subpixels per pixel",
                vc_config.threshold,
                vc_config.num_shares,
                vc.block_width()
            );
            println!("Shares saved to:\n{}", session.display());
        }

        CliArgument::Combine {
            shares,
            threshold,
            label,
            output,
        } => {
            let label = label.unwrap_or(config.label);
            let output = output.unwrap_or_else(|| {
                let dir = shares[0].parent().unwrap_or_else(|| Path::new("."));
                reconstruction_path(dir, &label)
            });

            let image: BinaryImage = match load_shares(shares.as_slice())? {
                LoadedShares::Tagged(tagged) => {
                    if let Some(k) = threshold {
                        if k != tagged[0].metadata.threshold {
                            warn!(
                                "--threshold {} ignored, shares record a threshold of {}",
                                k, tagged[0].metadata.threshold
                            );
                        }
                    }
                    reconstruct_image(&tagged)?
                }
                LoadedShares::Untagged(grids) => {
                    let result = reconstruct_from_grids(&grids, threshold)?;
                    for warning in &result.warnings {
                        eprintln!("warning: {}", warning);
                    }
                    result.image
                }
            };

            save_binary_grid(&image, &output)?;
            println!(
                "Image reconstructed and saved to:\n{}",
                output.display()
            );
        }

        CliArgument::Inspect { share } => match load_shares(std::slice::from_ref(&share))? {
            LoadedShares::Tagged(tagged) => println!("{}", tagged[0]),
            LoadedShares::Untagged(grids) => {
                let grid = &grids[0];
                println!("{}x{} share without manifest", grid.width(), grid.height());
                match infer_block_width(&[grid]) {
                    Some(width) => println!("balanced blocks of {} subpixels", width),
                    None => println!("no balanced block layout found"),
                }
                match infer_subpixels(grid) {
                    Some(run) => println!("first black run: {} subpixels", run),
                    None => println!("share has no black subpixels"),
                }
            }
        },

        CliArgument::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}
