use {
    anyhow::Result,
    polars::prelude::{
        DataFrame,
        NamedFrom,
        ParquetWriter,
        Series,
    },
    serde::{
        de::DeserializeOwned,
        Serialize,
    },
    std::{
        fs::{
            read_to_string,
            File,
        },
        io::Write,
        path::Path,
    },
};


/// Write a config as pretty RON.
pub fn write_config<C: Serialize>(
    config: &C,
    path: impl AsRef<Path>,
) -> Result<()> {
    File::create(path)?.write_all(
        ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())?.as_bytes(),
    )?;
    Ok(())
}

/// Read a config from a RON file.
pub fn read_config<C: DeserializeOwned>(path: impl AsRef<Path>) -> Result<C> {
    Ok(ron::from_str(&read_to_string(path)?)?)
}

/// The mean of the last `window` values, or of all of them when there are
/// fewer. Zero for an empty slice.
pub fn rolling_mean(
    values: &[f64],
    window: usize,
) -> f64 {
    let tail = &values[values.len().saturating_sub(window.max(1))..];
    if tail.is_empty() {
        0.0
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    }
}

/// Write the score history as a Parquet file with the columns `episode` and
/// `episode_score`.
pub fn write_scores(
    scores: &[f64],
    path: impl AsRef<Path>,
) -> Result<()> {
    let episodes: Vec<u64> = (0..scores.len() as u64).collect();
    let mut df = DataFrame::new(vec![
        Series::new("episode", episodes),
        Series::new("episode_score", scores),
    ])?;

    ParquetWriter::new(File::create(path)?).finish(&mut df)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::configs::TrainConfig,
        polars::prelude::{
            ParquetReader,
            SerReader,
        },
        std::{
            env::temp_dir,
            fs::create_dir_all,
        },
    };

    #[test]
    fn rolling_mean_uses_the_tail() {
        assert_eq!(rolling_mean(&[], 100), 0.0);
        assert_eq!(rolling_mean(&[1.0, 2.0, 3.0], 100), 2.0);
        assert_eq!(rolling_mean(&[10.0, 2.0, 4.0], 2), 3.0);
    }

    #[test]
    fn configs_round_trip_through_files() -> Result<()> {
        let dir = temp_dir().join("collab_rl_util_config");
        create_dir_all(&dir)?;
        let path = dir.join("config_training.ron");

        let mut config = TrainConfig::new(12);
        config.set_solved_threshold(0.5);
        write_config(&config, &path)?;
        let parsed: TrainConfig = read_config(&path)?;
        assert_eq!(parsed, config);
        Ok(())
    }

    #[test]
    fn scores_are_written_as_parquet() -> Result<()> {
        let dir = temp_dir().join("collab_rl_util_scores");
        create_dir_all(&dir)?;
        let path = dir.join("scores.parquet");

        write_scores(&[0.0, 0.5, 1.5], &path)?;
        let df = ParquetReader::new(File::open(&path)?).finish()?;
        assert_eq!(df.height(), 3);
        assert_eq!(df.get_column_names(), vec!["episode", "episode_score"]);
        Ok(())
    }
}
