// ----------------------------------- CLI -----------------------------------
#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "ctis", about = "Simulate a CTIS image and reconstruct its hyperspectral cube by EM")]
pub struct Cli {

    /// Run configuration file
    #[clap(short, long, default_value = "ctis-config.toml")]
    pub config: PathBuf,

    /// Image this cube (raw file) instead of the configured phantom
    #[clap(long)]
    pub cube: Option<PathBuf>,

    /// Override the phantom's number of voxels: rows,columns,bands
    #[clap(short, long, value_parser = parse_triplet::<usize>)]
    pub nvoxels: Option<(usize, usize, usize)>,

    /// Override the number of EM iterations in the config file
    #[clap(short, long)]
    pub iterations: Option<usize>,

    /// Override automatic generation of output file names
    #[clap(short, long)]
    pub out_files: Option<String>,

    /// Also write the estimate of every n-th iteration
    #[clap(long)]
    pub save_every: Option<usize>,

    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub num_threads: usize,
}

// --------------------------------------------------------------------------------

use std::error::Error;
use std::fs::create_dir_all;
use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use ctis::config::{read_config_file, OpticalParameters};
use ctis::fom::{relative_error, total_energy};
use ctis::index::vectorize_cube;
use ctis::io::raw;
use ctis::system_matrix::build_matrix_with_progress;
use ctis::utils::{group_digits, parse_triplet, timing::Progress};
use ctis::{simulate, CubeDim, Mlem};

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::init();
    let args = Cli::parse();
    let mut progress = Progress::new();

    progress.start(&format!("Reading configuration {:?}", args.config));
    let config = read_config_file(&args.config)?;
    let optics = config.optics.parameters()?;
    let iterations = args.iterations.unwrap_or(config.iterations);
    progress.done();

    // Set the maximum number of threads used by rayon for parallel iteration
    match rayon::ThreadPoolBuilder::new().num_threads(args.num_threads).build_global() {
        Err(e) => println!("{}", e),
        Ok(_)  => println!("Using up to {} threads.", args.num_threads),
    }

    // -------- The scene ------------------------------------------------------------
    let cube = if let Some(path) = &args.cube {
        progress.start(&format!("Reading cube {:?}", path));
        raw::read_cube(path)?
    } else {
        let (nx, ny, nz) = args.nvoxels.unwrap_or(config.cube.nvoxels);
        progress.start(&format!("Generating {nx} x {ny} x {nz} phantom"));
        config.cube.phantom.cube([nx, ny, nz])
    };
    progress.done();
    let (nx, ny, nz) = cube.dim();
    let n = [nx, ny, nz];

    let file_pattern = guess_filename(&args, n, &optics);
    let out = |suffix: &str| PathBuf::from(format!("{file_pattern}_{suffix}.raw"));
    // If the directory where results will be written does not exist yet, make it
    if let Some(dir) = out("image").parent() { create_dir_all(dir)? }

    // -------- Forward model --------------------------------------------------------
    progress.start("Simulating CTIS image");
    let image = simulate(cube.view(), &optics)?;
    progress.done();
    let (gx, gy) = image.dim();
    println!("    {gx} x {gy} pixels, total energy {:.4} (cube: {:.4})",
             total_energy(&image), total_energy(&cube));
    raw::write(&image, &out("image"))?;

    progress.startln("Building system matrix");
    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::default_bar()
                  .template("[{elapsed_precise}] {wide_bar} {pos}/{len} voxels ({eta_precise})")?);
    let h = build_matrix_with_progress(n, &optics, &bar)?;
    progress.done_with_message(&format!("Built system matrix with {} non-zeros", group_digits(h.nnz())));

    // -------- Reconstruction -------------------------------------------------------
    let truth = vectorize_cube(cube.view());
    progress.start("Initializing EM");
    let mlem = Mlem::new(&h, image.view(), config.initialization)?;
    progress.done();
    println!("    Initial relative error {:8.4}", relative_error(mlem.estimate(), &truth));

    let mut estimate = mlem.estimate().clone();
    for (n, f) in mlem.take(iterations).enumerate() {
        let n = n + 1;
        progress.done_with_message(&format!("Iteration {n:3}    relative error {:8.4}", relative_error(&f, &truth)));
        if args.save_every.map_or(false, |every| every > 0 && n % every == 0) {
            raw::write(&h.to_cube(f.clone())?, &out(&format!("{n:03}")))?;
        }
        estimate = f;
    }

    let reconstruction = h.to_cube(estimate)?;
    raw::write(&reconstruction, &out("reco"))?;
    progress.done_with_message(&format!("Wrote {:?}", out("reco")));
    Ok(())
}

fn guess_filename(args: &Cli, [nx, ny, nz]: CubeDim, optics: &OpticalParameters) -> String {
    if let Some(pattern) = &args.out_files {
        pattern.to_string()
    } else {
        let orders = optics.layout().n_orders();
        let psf = optics.sigma_psf.map_or(String::from("OFF"), |s| format!("{s:.2}"));
        format!("data/out/ctis/{nx}_{ny}_{nz}_orders_{orders}_psf_{psf}")
    }
}
