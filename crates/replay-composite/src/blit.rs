//! Nearest-neighbour copy of a frame into a region of the canvas.

use rayon::prelude::*;
use replay_core::{Frame, Rect};

/// Scale `source` into `bounds` of `target` with nearest-neighbour sampling.
///
/// The part of `bounds` outside the target is ignored. Returns false if the
/// pixel formats differ or nothing was drawn.
pub fn blit_nearest(source: &Frame, target: &mut Frame, bounds: Rect) -> bool {
    if source.format() != target.format() {
        return false;
    }

    let canvas = Rect::full(target.width(), target.height());
    let Some(region) = bounds.intersection(canvas) else {
        return false;
    };
    if source.width() == 0 || source.height() == 0 {
        return false;
    }

    // Whole canvas at the same size: straight copy.
    if region == canvas && bounds == canvas && source.descriptor().is_compatible(target.descriptor())
    {
        return target.copy_from(source).is_ok();
    }

    let bpp = source.format().bytes_per_pixel();
    let stride = target.descriptor().stride();
    let (src_width, src_height) = (source.width() as u64, source.height() as u64);

    let x_map: Vec<usize> = (region.x..region.right())
        .map(|x| ((x - bounds.x) as u64 * src_width / bounds.width as u64) as usize * bpp)
        .collect();
    let x_offset = region.x as usize * bpp;

    target
        .data_mut()
        .par_chunks_mut(stride)
        .skip(region.y as usize)
        .take(region.height as usize)
        .enumerate()
        .for_each(|(i, row)| {
            let y = region.y + i as u32;
            let src_y = ((y - bounds.y) as u64 * src_height / bounds.height as u64) as u32;
            let src_row = source.row(src_y);
            let dst = &mut row[x_offset..x_offset + x_map.len() * bpp];
            for (pixel, &src_x) in dst.chunks_exact_mut(bpp).zip(&x_map) {
                pixel.copy_from_slice(&src_row[src_x..src_x + bpp]);
            }
        });

    true
}
