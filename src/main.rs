/*!
## Sgix (Subgraph Index)

A command-line utility for pruning graph databases before subgraph search.

Frequent paths and rings are mined from a database, graphs are turned into
feature vectors and query vectors are matched against database vectors.

```text
sgix mine <db> <features-out> [--len N] [--min-ratio R] [--max-ratio R] [-k N]
sgix vectorize <graphs> <features> <vectors-out> [--len N]
sgix search <db-vectors> <query-vectors> <out> [-p containment|dominance]
```

### License

MIT
*/
use subgraph_index::{filter_candidates, format, graph, mine, vectorize};

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    time::Instant,
};

use eyre::Result;

fn main() -> Result<()> {
    env_logger::init();

    let command = cli::main()?;
    let total = Instant::now();

    match command {
        cli::Command::Mine {
            database,
            features,
            config,
        } => {
            log::info!("Config: {}", config);
            config.validate()?;

            let database = measure("Load database", || graph::parse(&database))?;
            let mined = measure("Mine features", || mine(&database, &config));
            log::info!("Mined {} features", mined.len());

            measure("Write features", || {
                write_to(&features, |out| format::write_features(out, &mined))
            })?;
        }
        cli::Command::Vectorize {
            graphs,
            features,
            vectors,
            config,
        } => {
            let graphs = measure("Load graphs", || graph::parse(&graphs))?;
            let features = measure("Load features", || {
                format::read_features(BufReader::new(File::open(&features)?))
            })?;
            log::info!("Vectorizing against {} features", features.len());

            let matrix = measure("Vectorize", || vectorize(&graphs, &features, &config));
            log::info!("Feature matrix: {}", matrix);

            measure("Write vectors", || {
                write_to(&vectors, |out| format::write_vectors(out, &matrix))
            })?;
        }
        cli::Command::Search {
            database,
            queries,
            candidates,
            predicate,
        } => {
            let database = measure("Load database vectors", || {
                format::read_vectors(BufReader::new(File::open(&database)?))
            })?;
            let queries = measure("Load query vectors", || {
                format::read_vectors(BufReader::new(File::open(&queries)?))
            })?;

            let result = measure("Filter candidates", || {
                filter_candidates(&database, &queries, predicate)
            })?;
            log::info!("Candidate counts: {}", result);
            log::info!("{}", result.stats());

            measure("Write candidates", || {
                write_to(&candidates, |out| format::write_candidates(out, &result))
            })?;
        }
    }

    log::info!("Total runtime = {:?}", total.elapsed());

    Ok(())
}

fn write_to(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<(), subgraph_index::Error>,
) -> Result<(), subgraph_index::Error> {
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out)?;
    out.flush()?;
    Ok(())
}

fn measure<R>(desc: &str, func: impl FnOnce() -> R) -> R {
    log::info!("Start :: {}", desc);
    let start = Instant::now();
    let result = func();
    log::info!("Finish :: {} took {:?}", desc, start.elapsed());
    result
}

mod cli {
    use pico_args::Arguments;
    use std::{ffi::OsStr, path::PathBuf};
    use subgraph_index::{Config, Predicate};

    use crate::Result;

    #[derive(Debug)]
    pub(crate) enum Command {
        Mine {
            database: PathBuf,
            features: PathBuf,
            config: Config,
        },
        Vectorize {
            graphs: PathBuf,
            features: PathBuf,
            vectors: PathBuf,
            config: Config,
        },
        Search {
            database: PathBuf,
            queries: PathBuf,
            candidates: PathBuf,
            predicate: Predicate,
        },
    }

    pub(crate) fn main() -> Result<Command> {
        let mut pargs = Arguments::from_env();

        fn as_path_buf(arg: &OsStr) -> Result<PathBuf> {
            Ok(arg.into())
        }

        let defaults = Config::default();

        let command = match pargs.subcommand()?.as_deref() {
            Some("mine") => {
                let config = Config::new(
                    pargs
                        .opt_value_from_str("--len")?
                        .unwrap_or(defaults.max_path_len),
                    pargs
                        .opt_value_from_str("--min-ratio")?
                        .unwrap_or(defaults.min_support_ratio),
                    pargs
                        .opt_value_from_str("--max-ratio")?
                        .unwrap_or(defaults.max_support_ratio),
                    pargs
                        .opt_value_from_str(["-k", "--top-k"])?
                        .unwrap_or(defaults.top_k),
                );
                Command::Mine {
                    database: pargs.free_from_os_str(as_path_buf)?,
                    features: pargs.free_from_os_str(as_path_buf)?,
                    config,
                }
            }
            Some("vectorize") => {
                let config = Config {
                    max_path_len: pargs
                        .opt_value_from_str("--len")?
                        .unwrap_or(defaults.max_path_len),
                    ..defaults
                };
                Command::Vectorize {
                    graphs: pargs.free_from_os_str(as_path_buf)?,
                    features: pargs.free_from_os_str(as_path_buf)?,
                    vectors: pargs.free_from_os_str(as_path_buf)?,
                    config,
                }
            }
            Some("search") => {
                let predicate = pargs
                    .opt_value_from_str(["-p", "--predicate"])?
                    .unwrap_or(defaults.predicate);
                Command::Search {
                    database: pargs.free_from_os_str(as_path_buf)?,
                    queries: pargs.free_from_os_str(as_path_buf)?,
                    candidates: pargs.free_from_os_str(as_path_buf)?,
                    predicate,
                }
            }
            Some(other) => return Err(eyre::eyre!("Unsupported command {}", other)),
            None => return Err(eyre::eyre!("Expected one of: mine, vectorize, search")),
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(eyre::eyre!("Unexpected arguments: {:?}", remaining));
        }

        Ok(command)
    }
}
