//! Plain-text summary of a recognition run

use crate::pipeline::RecognitionResult;
use std::fmt;

impl RecognitionResult {
    /// Human readable listing of every instance with its rotation and translation
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RecognitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model instances found: {}", self.hypotheses.len())?;

        for (i, hypothesis) in self.hypotheses.iter().enumerate() {
            let r = hypothesis.rotation_matrix();
            let t = hypothesis.translation();

            writeln!(f, "\n    Instance {}:", i + 1)?;
            writeln!(
                f,
                "        Correspondences belonging to this instance: {}",
                hypothesis.support()
            )?;
            writeln!(f)?;
            for row in 0..3 {
                let label = if row == 1 { "        R = " } else { "            " };
                writeln!(
                    f,
                    "{}| {:6.3} {:6.3} {:6.3} |",
                    label,
                    r[(row, 0)],
                    r[(row, 1)],
                    r[(row, 2)]
                )?;
            }
            writeln!(f)?;
            writeln!(f, "        t = < {:.3}, {:.3}, {:.3} >", t.x, t.y, t.z)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};
    use recog3d_core::{Correspondence, Keypoints, PoseHypothesis};

    #[test]
    fn test_report_lists_each_instance() {
        let hypothesis = PoseHypothesis::new(
            Isometry3::from_parts(Translation3::new(0.1, -0.25, 1.5), UnitQuaternion::identity()),
            vec![Correspondence::new(0, 0, 0.1); 7],
            7.0,
        );
        let result = RecognitionResult {
            hypotheses: vec![hypothesis],
            model_keypoints: Keypoints::empty(),
            scene_keypoints: Keypoints::empty(),
            correspondences: Vec::new(),
        };

        let report = result.report();
        assert!(report.starts_with("Model instances found: 1\n"));
        assert!(report.contains("    Instance 1:"));
        assert!(report.contains("Correspondences belonging to this instance: 7"));
        assert!(report.contains("        R = |  0.000  1.000  0.000 |"));
        assert!(report.contains("t = < 0.100, -0.250, 1.500 >"));
    }

    #[test]
    fn test_report_without_instances() {
        let result = RecognitionResult {
            hypotheses: Vec::new(),
            model_keypoints: Keypoints::empty(),
            scene_keypoints: Keypoints::empty(),
            correspondences: Vec::new(),
        };
        assert_eq!(result.report(), "Model instances found: 0\n");
    }
}
