use crate::error::EvalError;
use bytemuck::{Pod, Zeroable};
use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TrajectoryPoint {
    pub x: f32,
    pub y: f32,
}

impl From<[f32; 2]> for TrajectoryPoint {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// Ordered (x, y) samples for every agent
///
/// Dump layout, little-endian throughout:
/// `u32` agent count, then per agent a `u32` sample count followed by that many `f32` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryLog {
    agents: Vec<Vec<TrajectoryPoint>>,
}

impl TrajectoryLog {
    pub fn new(num_agents: usize) -> Self {
        Self {
            agents: vec![Vec::new(); num_agents],
        }
    }

    pub fn push(&mut self, agent: usize, point: impl Into<TrajectoryPoint>) {
        self.agents[agent].push(point.into());
    }

    pub fn agent(&self, agent: usize) -> &[TrajectoryPoint] {
        &self.agents[agent]
    }

    /// Total samples across all agents
    pub fn len(&self) -> usize {
        self.agents.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), EvalError> {
        writer.write_all(&(self.agents.len() as u32).to_le_bytes())?;

        for points in &self.agents {
            writer.write_all(&(points.len() as u32).to_le_bytes())?;
            for coord in bytemuck::cast_slice::<TrajectoryPoint, f32>(points) {
                writer.write_all(&coord.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, EvalError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut cursor = bytes.as_slice();
        let num_agents = take_u32(&mut cursor)?;

        // the count comes from the file, so nothing is sized from it up front
        let mut agents = Vec::new();
        for _ in 0..num_agents {
            let len = take_u32(&mut cursor)? as usize;
            let num_bytes = len
                .checked_mul(size_of::<TrajectoryPoint>())
                .filter(|n| *n <= cursor.len())
                .ok_or(EvalError::Malformed("sample data cut short"))?;

            let (samples, rest) = cursor.split_at(num_bytes);
            let coords: Vec<f32> = samples
                .chunks_exact(size_of::<f32>())
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            agents.push(bytemuck::cast_slice::<f32, TrajectoryPoint>(&coords).to_vec());
            cursor = rest;
        }

        if !cursor.is_empty() {
            return Err(EvalError::Malformed("trailing bytes"));
        }

        Ok(Self { agents })
    }

    /// Writes the dump to `path`, creating parent folders as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EvalError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))?;

        tracing::info!("Saved {} samples to: {path:?}", self.len());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EvalError> {
        Self::read_from(fs::File::open(path)?)
    }
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, EvalError> {
    let Some((head, rest)) = cursor.split_first_chunk::<4>() else {
        return Err(EvalError::Malformed("header cut short"));
    };

    *cursor = rest;
    Ok(u32::from_le_bytes(*head))
}
