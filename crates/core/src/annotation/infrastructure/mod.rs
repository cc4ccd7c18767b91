pub mod raster_annotator;
