pub mod onnx_blazeface_locator;
