//! Per-system settings and file layout.
//!
//! All paths are derived once, in `SystemSettings::new`, from the working
//! directory, the collision system and the particlization model. Changing the
//! run id goes through `with_run_id`, which returns a new value with the
//! run-dependent paths recomputed.
//!
//! Layout under `WORKDIR`:
//!
//! ```text
//! production_designs/500pts/design_pts_{A}_{B}_{sqrts}_production/
//!     design_points_{main|validation}_{A}{B}-{sqrts}.dat
//!     design_ranges_{main|validation}_{A}{B}-{sqrts}.dat
//!     design_labels_{A}{B}-{sqrts}.dat
//! model_calculations/{run_id}/Events/{main,validation}/
//! model_calculations/{run_id}/Obs/{main,validation}.dat
//! model_calculations/MAP/{idf short label}/Obs/obs_{system}.dat
//! emulator/emulator-{system}-idf-{idf index}.json
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::data::params::design_remove_idx;
use crate::data::registry::{au_au_200, pb_pb_2760};
use crate::domain::{Idf, PointSet, SystemId};
use crate::error::PipelineError;

/// Environment variable naming the analysis working directory.
pub const WORKDIR_ENV: &str = "WORKDIR";

/// Resolve the working directory (`.env` honoured), defaulting to `.`.
pub fn workdir_from_env() -> PathBuf {
    dotenvy::dotenv().ok();
    std::env::var_os(WORKDIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Immutable settings of one collision system.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSettings {
    workdir: PathBuf,
    system: SystemId,
    idf: Idf,
    run_id: String,
    n_design: usize,
    n_validation: usize,
    npc: usize,
    design_remove_idx: Vec<usize>,

    design_dir: PathBuf,
    main_events_dir: PathBuf,
    validation_events_dir: PathBuf,
    main_obs_file: PathBuf,
    validation_obs_file: PathBuf,
    map_obs_file: PathBuf,
    emulator_file: PathBuf,
}

impl SystemSettings {
    /// Settings with the default run id `production_500pts_{A}_{B}_{sqrts}`
    /// and no design points removed.
    pub fn new(workdir: impl Into<PathBuf>, system: SystemId, idf: Idf) -> Self {
        let workdir = workdir.into();
        let run_id = format!(
            "production_500pts_{}_{}_{}",
            system.projectile(),
            system.target(),
            system.sqrts()
        );
        let design_dir = workdir
            .join("production_designs")
            .join("500pts")
            .join(format!(
                "design_pts_{}_{}_{}_production",
                system.projectile(),
                system.target(),
                system.sqrts()
            ));
        let map_obs_file = workdir
            .join("model_calculations")
            .join("MAP")
            .join(idf.short_label())
            .join("Obs")
            .join(format!("obs_{system}.dat"));
        let emulator_file = workdir
            .join("emulator")
            .join(format!("emulator-{system}-idf-{}.json", idf.index()));

        let mut settings = Self {
            workdir,
            system,
            idf,
            run_id: String::new(),
            n_design: 500,
            n_validation: 100,
            npc: 10,
            design_remove_idx: Vec::new(),
            design_dir,
            main_events_dir: PathBuf::new(),
            validation_events_dir: PathBuf::new(),
            main_obs_file: PathBuf::new(),
            validation_obs_file: PathBuf::new(),
            map_obs_file,
            emulator_file,
        };
        settings.set_run_paths(run_id);
        settings
    }

    /// Production settings for the calibrated systems.
    ///
    /// `Pb-Pb-2760` uses 7 principal components, `Au-Au-200` uses 5; both drop
    /// the known-bad design points of the chosen particlization model. Other
    /// systems have no production run and are a `Config` error.
    pub fn production(workdir: impl Into<PathBuf>, system: SystemId, idf: Idf) -> Result<Self, PipelineError> {
        let npc = if system == pb_pb_2760() {
            7
        } else if system == au_au_200() {
            5
        } else {
            return Err(PipelineError::Config(format!("no production run configured for {system}")));
        };
        let mut settings = Self::new(workdir, system, idf);
        settings.npc = npc;
        settings.design_remove_idx = design_remove_idx(idf);
        debug!(
            system = %settings.system,
            run_id = %settings.run_id,
            removed = settings.design_remove_idx.len(),
            "production settings"
        );
        Ok(settings)
    }

    /// Same settings with the run-dependent paths recomputed for `run_id`.
    pub fn with_run_id(&self, run_id: impl Into<String>) -> Self {
        let mut out = self.clone();
        out.set_run_paths(run_id.into());
        out
    }

    /// Same settings with a different list of removed design points.
    pub fn with_design_remove_idx(&self, mut remove: Vec<usize>) -> Self {
        remove.sort_unstable();
        remove.dedup();
        Self {
            design_remove_idx: remove,
            ..self.clone()
        }
    }

    fn set_run_paths(&mut self, run_id: String) {
        let run_dir = self.workdir.join("model_calculations").join(&run_id);
        self.main_events_dir = run_dir.join("Events").join("main");
        self.validation_events_dir = run_dir.join("Events").join("validation");
        self.main_obs_file = run_dir.join("Obs").join("main.dat");
        self.validation_obs_file = run_dir.join("Obs").join("validation.dat");
        self.run_id = run_id;
    }

    fn design_stem(&self) -> String {
        format!(
            "{}{}-{}",
            self.system.projectile(),
            self.system.target(),
            self.system.sqrts()
        )
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn system(&self) -> &SystemId {
        &self.system
    }

    pub fn idf(&self) -> Idf {
        self.idf
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn n_design(&self) -> usize {
        self.n_design
    }

    pub fn n_validation(&self) -> usize {
        self.n_validation
    }

    /// Number of principal components retained by the emulator.
    pub fn npc(&self) -> usize {
        self.npc
    }

    /// Design point indices excluded from the emulator design (sorted).
    pub fn design_remove_idx(&self) -> &[usize] {
        &self.design_remove_idx
    }

    pub fn design_dir(&self) -> &Path {
        &self.design_dir
    }

    pub fn design_file(&self, pset: PointSet) -> PathBuf {
        self.design_dir
            .join(format!("design_points_{}_{}.dat", pset.as_str(), self.design_stem()))
    }

    pub fn range_file(&self, pset: PointSet) -> PathBuf {
        self.design_dir
            .join(format!("design_ranges_{}_{}.dat", pset.as_str(), self.design_stem()))
    }

    pub fn labels_file(&self) -> PathBuf {
        self.design_dir.join(format!("design_labels_{}.dat", self.design_stem()))
    }

    pub fn events_dir(&self, pset: PointSet) -> &Path {
        match pset {
            PointSet::Main => &self.main_events_dir,
            PointSet::Validation => &self.validation_events_dir,
        }
    }

    pub fn obs_file(&self, pset: PointSet) -> &Path {
        match pset {
            PointSet::Main => &self.main_obs_file,
            PointSet::Validation => &self.validation_obs_file,
        }
    }

    pub fn map_obs_file(&self) -> &Path {
        &self.map_obs_file
    }

    pub fn emulator_file(&self) -> &Path {
        &self.emulator_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::xe_xe_5440;

    #[test]
    fn design_paths_follow_layout() {
        let s = SystemSettings::new("/work", pb_pb_2760(), Idf::Ce);
        assert_eq!(
            s.design_file(PointSet::Main),
            PathBuf::from(
                "/work/production_designs/500pts/design_pts_Pb_Pb_2760_production/design_points_main_PbPb-2760.dat"
            )
        );
        assert_eq!(
            s.range_file(PointSet::Validation),
            PathBuf::from(
                "/work/production_designs/500pts/design_pts_Pb_Pb_2760_production/design_ranges_validation_PbPb-2760.dat"
            )
        );
        assert!(s.labels_file().ends_with("design_labels_PbPb-2760.dat"));
        assert_eq!(
            s.map_obs_file(),
            Path::new("/work/model_calculations/MAP/C.E./Obs/obs_Pb-Pb-2760.dat")
        );
        assert_eq!(s.emulator_file(), Path::new("/work/emulator/emulator-Pb-Pb-2760-idf-1.json"));
    }

    #[test]
    fn run_paths_are_recomputed_by_with_run_id() {
        let s = SystemSettings::new("/work", au_au_200(), Idf::Grad);
        assert_eq!(s.run_id(), "production_500pts_Au_Au_200");
        assert_eq!(
            s.obs_file(PointSet::Main),
            Path::new("/work/model_calculations/production_500pts_Au_Au_200/Obs/main.dat")
        );

        let t = s.with_run_id("test_run");
        assert_eq!(
            t.events_dir(PointSet::Validation),
            Path::new("/work/model_calculations/test_run/Events/validation")
        );
        assert_eq!(t.obs_file(PointSet::Validation), Path::new("/work/model_calculations/test_run/Obs/validation.dat"));
        // Original is untouched.
        assert_eq!(s.run_id(), "production_500pts_Au_Au_200");
        assert_eq!(t.design_file(PointSet::Main), s.design_file(PointSet::Main));
    }

    #[test]
    fn production_settings_per_system() {
        let pb = SystemSettings::production("/work", pb_pb_2760(), Idf::Grad).unwrap();
        assert_eq!(pb.npc(), 7);
        assert_eq!(pb.n_design(), 500);
        assert_eq!(pb.n_validation(), 100);
        assert!(pb.design_remove_idx().contains(&334));
        assert!(pb.design_remove_idx().windows(2).all(|w| w[0] < w[1]));

        let au = SystemSettings::production("/work", au_au_200(), Idf::Ce).unwrap();
        assert_eq!(au.npc(), 5);

        assert!(matches!(
            SystemSettings::production("/work", xe_xe_5440(), Idf::Ce),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn remove_idx_override_is_sorted() {
        let s = SystemSettings::new("/work", pb_pb_2760(), Idf::Ce).with_design_remove_idx(vec![9, 2, 9, 4]);
        assert_eq!(s.design_remove_idx(), &[2, 4, 9]);
    }
}
